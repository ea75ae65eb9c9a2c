use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::quote::{
    NewQuoteLine as DomainNewQuoteLine, NewQuoteRequest, PatientInfo, QuoteLine as DomainQuoteLine,
    QuoteRequest, QuoteStatus,
};
use crate::domain::types::{
    ClinicId, Email, Money, PersonName, PhoneNumber, PromoCode, QuoteId, QuoteLineId, SafeText,
    TreatmentId, TreatmentName, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::quotes)]
/// Diesel model for [`crate::domain::quote::QuoteRequest`] without its lines.
pub struct Quote {
    pub id: i32,
    pub patient_id: i32,
    pub clinic_id: Option<i32>,
    pub status: String,
    pub promo_code: Option<String>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    pub travel_month: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::quotes)]
pub struct NewQuote<'a> {
    pub patient_id: i32,
    pub clinic_id: Option<i32>,
    pub status: &'a str,
    pub promo_code: Option<&'a str>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub patient_name: &'a str,
    pub patient_email: &'a str,
    pub patient_phone: Option<&'a str>,
    pub travel_month: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::quote_lines)]
#[diesel(belongs_to(Quote, foreign_key = quote_id))]
pub struct QuoteLine {
    pub id: i32,
    pub quote_id: i32,
    pub treatment_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::quote_lines)]
pub struct NewQuoteLine<'a> {
    pub quote_id: i32,
    pub treatment_id: i32,
    pub name: &'a str,
    pub unit_price: i64,
    pub quantity: i32,
}

impl<'a> From<&'a NewQuoteRequest> for NewQuote<'a> {
    fn from(quote: &'a NewQuoteRequest) -> Self {
        Self {
            patient_id: quote.patient_id.get(),
            clinic_id: quote.clinic_id.map(ClinicId::get),
            status: QuoteStatus::Pending.as_str(),
            promo_code: quote.promo_code.as_ref().map(PromoCode::as_str),
            subtotal: quote.subtotal.pence(),
            discount: quote.discount.pence(),
            total: quote.total.pence(),
            patient_name: quote.patient.name.as_str(),
            patient_email: quote.patient.email.as_str(),
            patient_phone: quote.patient.phone.as_ref().map(PhoneNumber::as_str),
            travel_month: quote.patient.travel_month.as_deref(),
            notes: quote.patient.notes.as_ref().map(SafeText::as_str),
        }
    }
}

impl<'a> NewQuoteLine<'a> {
    pub fn new(quote_id: i32, line: &'a DomainNewQuoteLine) -> Self {
        Self {
            quote_id,
            treatment_id: line.treatment_id.get(),
            name: line.name.as_str(),
            unit_price: line.unit_price.pence(),
            quantity: line.quantity,
        }
    }
}

impl TryFrom<QuoteLine> for DomainQuoteLine {
    type Error = TypeConstraintError;

    fn try_from(line: QuoteLine) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QuoteLineId::new(line.id)?,
            treatment_id: TreatmentId::new(line.treatment_id)?,
            name: TreatmentName::new(line.name)?,
            unit_price: Money::from_pence(line.unit_price)?,
            quantity: line.quantity,
        })
    }
}

/// Assembles a quote request from its row and line rows.
pub fn quote_into_domain(
    quote: Quote,
    lines: Vec<QuoteLine>,
) -> Result<QuoteRequest, TypeConstraintError> {
    let lines = lines
        .into_iter()
        .map(DomainQuoteLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QuoteRequest {
        id: QuoteId::new(quote.id)?,
        patient_id: UserId::new(quote.patient_id)?,
        clinic_id: quote.clinic_id.map(ClinicId::new).transpose()?,
        status: QuoteStatus::try_from(quote.status.as_str())?,
        promo_code: quote.promo_code.map(PromoCode::new).transpose()?,
        subtotal: Money::from_pence(quote.subtotal)?,
        discount: Money::from_pence(quote.discount)?,
        total: Money::from_pence(quote.total)?,
        patient: PatientInfo {
            name: PersonName::new(quote.patient_name)?,
            email: Email::new(quote.patient_email)?,
            phone: quote.patient_phone.map(PhoneNumber::new).transpose()?,
            travel_month: quote.travel_month,
            notes: SafeText::optional(quote.notes)?,
        },
        lines,
        created_at: quote.created_at,
        updated_at: quote.updated_at,
    })
}
