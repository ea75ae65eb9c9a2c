//! Printable quote documents.
//!
//! The document is a self-contained HTML page rendered from an embedded
//! template, so it works without the templates directory and can be saved
//! to PDF by the browser's print dialog.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::domain::auth::AuthenticatedUser;
use crate::domain::clinic::Clinic;
use crate::domain::pricing::{savings_percent, uk_price};
use crate::domain::quote::QuoteRequest;
use crate::domain::treatment_plan::{PlanStatus, TreatmentPlan};
use crate::domain::types::{Money, QuoteId};
use crate::repository::{ClinicReader, PlanReader, QuoteReader, UserReader, UserWriter};
use crate::services::quotes::ensure_quote_access;
use crate::services::{ServiceError, ServiceResult};

pub const VALIDITY_DAYS: i64 = 30;
const TEMPLATE_NAME: &str = "quote_document.html";
const TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Quote #{{ quote_id }}</title>
<style>
body { font-family: Helvetica, Arial, sans-serif; color: #222; margin: 2rem; }
h1 { margin-bottom: 0; }
table { width: 100%; border-collapse: collapse; margin: 1.5rem 0; }
th, td { padding: .4rem .6rem; border-bottom: 1px solid #ddd; text-align: left; }
td.num, th.num { text-align: right; }
.muted { color: #777; }
.savings { font-size: 1.25rem; color: #11724a; }
@media print { .no-print { display: none; } }
</style>
</head>
<body>
<h1>Treatment quote #{{ quote_id }}</h1>
<p class="muted">Generated {{ generated_on }} &middot; valid until {{ valid_until }}</p>
{% if clinic %}<p><strong>{{ clinic.name }}</strong>, {{ clinic.city }}{% if clinic.address %} &middot; {{ clinic.address }}{% endif %}</p>{% endif %}
<p>Prepared for {{ patient.name }} &lt;{{ patient.email }}&gt;{% if patient.travel_month %} &middot; travelling {{ patient.travel_month }}{% endif %}</p>
<table>
<thead><tr><th>Treatment</th><th class="num">Qty</th><th class="num">Unit price</th><th class="num">Total</th><th class="num">UK equivalent</th></tr></thead>
<tbody>
{% for line in lines %}<tr><td>{{ line.name }}</td><td class="num">{{ line.quantity }}</td><td class="num">{{ line.unit_price | money }}</td><td class="num">{{ line.total | money }}</td><td class="num muted">{{ line.uk_total | money }}</td></tr>
{% endfor %}</tbody>
</table>
<table>
<tr><td>Subtotal</td><td class="num">{{ subtotal | money }}</td></tr>
{% if discount > 0 %}<tr><td>Promotion{% if promo_code %} ({{ promo_code }}){% endif %}</td><td class="num">-{{ discount | money }}</td></tr>{% endif %}
<tr><th>Total</th><th class="num">{{ total | money }}</th></tr>
<tr><td class="muted">Typical UK price</td><td class="num muted">{{ uk_total | money }}</td></tr>
</table>
<p class="savings">You save {{ savings_percent }}% compared with UK prices.</p>
{% if plan %}<p>Based on treatment plan v{{ plan_version }}.{% if plan_notes %} {{ plan_notes }}{% endif %}</p>{% endif %}
<p class="muted">Prices are estimates until confirmed by the clinic after consultation.</p>
<button class="no-print" onclick="window.print()">Print or save as PDF</button>
</body>
</html>
"#;

/// Tera filter rendering pence as `£1,234.50`.
pub fn money_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let pence = value
        .as_i64()
        .or_else(|| value.as_f64().map(|amount| amount.round() as i64))
        .ok_or_else(|| tera::Error::msg("money filter expects an amount in pence"))?;
    let money = Money::from_pence(pence).map_err(|err| tera::Error::msg(err.to_string()))?;
    Ok(Value::String(money.to_string()))
}

#[derive(Debug, Serialize)]
struct DocumentLine {
    name: String,
    quantity: i32,
    unit_price: Money,
    total: Money,
    uk_total: Money,
}

#[derive(Debug, Serialize)]
struct DocumentContext {
    quote_id: i32,
    generated_on: String,
    valid_until: String,
    clinic: Option<Clinic>,
    patient: crate::domain::quote::PatientInfo,
    lines: Vec<DocumentLine>,
    promo_code: Option<String>,
    subtotal: Money,
    discount: Money,
    total: Money,
    uk_total: Money,
    savings_percent: u32,
    plan: bool,
    plan_version: i32,
    plan_notes: Option<String>,
}

#[derive(Debug)]
pub struct QuoteDocument {
    pub file_name: String,
    pub html: String,
}

/// Most recent plan the patient has seen, if any.
fn latest_shared_plan(plans: Vec<TreatmentPlan>) -> Option<TreatmentPlan> {
    plans
        .into_iter()
        .filter(|plan| matches!(plan.status, PlanStatus::Sent | PlanStatus::Accepted))
        .max_by_key(|plan| plan.version)
}

fn document_context(
    quote: QuoteRequest,
    clinic: Option<Clinic>,
    plan: Option<TreatmentPlan>,
    today: NaiveDate,
) -> DocumentContext {
    let (lines, subtotal, discount, total) = match &plan {
        Some(plan) => {
            let lines: Vec<DocumentLine> = plan
                .lines
                .iter()
                .map(|line| DocumentLine {
                    name: line.description.as_str().to_string(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total: line.total(),
                    uk_total: uk_price(line.total()),
                })
                .collect();
            let total = plan.total();
            (lines, total, Money::ZERO, total)
        }
        None => {
            let lines = quote
                .lines
                .iter()
                .map(|line| DocumentLine {
                    name: line.name.as_str().to_string(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total: line.total(),
                    uk_total: uk_price(line.total()),
                })
                .collect();
            (lines, quote.subtotal, quote.discount, quote.total)
        }
    };
    let uk_total = uk_price(subtotal);

    DocumentContext {
        quote_id: quote.id.get(),
        generated_on: today.format("%-d %B %Y").to_string(),
        valid_until: (today + Duration::days(VALIDITY_DAYS))
            .format("%-d %B %Y")
            .to_string(),
        clinic,
        promo_code: quote
            .promo_code
            .as_ref()
            .filter(|_| plan.is_none())
            .map(|code| code.as_str().to_string()),
        patient: quote.patient,
        lines,
        subtotal,
        discount,
        total,
        uk_total,
        savings_percent: savings_percent(total, uk_total),
        plan: plan.is_some(),
        plan_version: plan.as_ref().map(|p| p.version).unwrap_or_default(),
        plan_notes: plan
            .as_ref()
            .and_then(|p| p.notes.as_ref())
            .map(|notes| notes.as_str().to_string()),
    }
}

fn render(context: &DocumentContext) -> ServiceResult<String> {
    let mut tera = Tera::default();
    tera.register_filter("money", money_filter);
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .and_then(|_| {
            let context = Context::from_serialize(context)?;
            tera.render(TEMPLATE_NAME, &context)
        })
        .map_err(|err| {
            log::error!("Failed to render quote document: {err}");
            ServiceError::Internal("could not render the quote document".to_string())
        })
}

/// Renders the quote, priced from its latest sent or accepted plan when one exists.
pub fn build_quote_document<R>(
    repo: &R,
    user: &AuthenticatedUser,
    quote_id: i32,
    today: NaiveDate,
) -> ServiceResult<QuoteDocument>
where
    R: UserReader + UserWriter + ClinicReader + QuoteReader + PlanReader + ?Sized,
{
    let quote = repo
        .get_quote_by_id(QuoteId::new(quote_id)?)?
        .ok_or(ServiceError::NotFound)?;
    ensure_quote_access(repo, user, &quote)?;

    let clinic = match quote.clinic_id {
        Some(id) => repo.get_clinic_by_id(id)?,
        None => None,
    };
    let plan = latest_shared_plan(repo.list_plans_for_quote(quote.id)?);
    let file_name = format!("quote-{}.html", quote.id);
    let html = render(&document_context(quote, clinic, plan, today))?;
    Ok(QuoteDocument { file_name, html })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::quote::{PatientInfo, QuoteLine, QuoteStatus};
    use crate::domain::types::{
        ClinicId, Email, PersonName, PlanId, PlanLineId, PromoCode, QuoteLineId, SafeText,
        TreatmentId, TreatmentName, UserId,
    };
    use crate::domain::treatment_plan::TreatmentPlanLine;

    fn quote() -> QuoteRequest {
        let now = Utc::now().naive_utc();
        QuoteRequest {
            id: QuoteId::new(12).unwrap(),
            patient_id: UserId::new(9).unwrap(),
            clinic_id: Some(ClinicId::new(1).unwrap()),
            status: QuoteStatus::Pending,
            promo_code: Some(PromoCode::new("SMILE10").unwrap()),
            subtotal: Money::from_pounds(1000),
            discount: Money::from_pounds(100),
            total: Money::from_pounds(900),
            patient: PatientInfo {
                name: PersonName::new("Jane <b>Doe</b>").unwrap(),
                email: Email::new("jane@example.com").unwrap(),
                phone: None,
                travel_month: Some("November".into()),
                notes: None,
            },
            lines: vec![QuoteLine {
                id: QuoteLineId::new(1).unwrap(),
                treatment_id: TreatmentId::new(3).unwrap(),
                name: TreatmentName::new("Dental implant").unwrap(),
                unit_price: Money::from_pounds(500),
                quantity: 2,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn plan(status: PlanStatus, version: i32) -> TreatmentPlan {
        let now = Utc::now().naive_utc();
        let id = PlanId::new(version).unwrap();
        TreatmentPlan {
            id,
            quote_id: QuoteId::new(12).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            patient_id: UserId::new(9).unwrap(),
            version,
            status,
            notes: None,
            lines: vec![TreatmentPlanLine {
                id: PlanLineId::new(version).unwrap(),
                plan_id: id,
                treatment_id: None,
                description: SafeText::new("Implant with crown").unwrap(),
                quantity: 2,
                unit_price: Money::from_pounds(600),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn money_filter_formats_pence() {
        let value = money_filter(&Value::from(123_450), &HashMap::new()).unwrap();
        assert_eq!(value, Value::String("£1,234.50".into()));
        assert!(money_filter(&Value::from("x"), &HashMap::new()).is_err());
    }

    #[test]
    fn quote_document_shows_totals_and_savings() {
        let html = render(&document_context(quote(), None, None, today())).unwrap();
        assert!(html.contains("£1,000.00"));
        assert!(html.contains("-£100.00"));
        assert!(html.contains("£2,500.00"));
        assert!(html.contains("You save 64%"));
        assert!(html.contains("valid until 15 November 2026"));
        assert!(html.contains("SMILE10"));
    }

    #[test]
    fn patient_text_is_escaped() {
        let html = render(&document_context(quote(), None, None, today())).unwrap();
        assert!(!html.contains("<b>Doe</b>"));
    }

    #[test]
    fn latest_shared_plan_prices_the_document() {
        let chosen = latest_shared_plan(vec![
            plan(PlanStatus::Superseded, 1),
            plan(PlanStatus::Sent, 2),
            plan(PlanStatus::Draft, 3),
        ])
        .unwrap();
        assert_eq!(chosen.version, 2);

        let context = document_context(quote(), None, Some(chosen), today());
        assert_eq!(context.total, Money::from_pounds(1200));
        assert_eq!(context.discount, Money::ZERO);
        assert!(context.promo_code.is_none());
    }
}
