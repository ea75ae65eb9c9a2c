//! Quote wizard, quote list and plan views.

use serde::Serialize;

use crate::domain::clinic::Clinic;
use crate::domain::package::TreatmentPackage;
use crate::domain::quote::{PatientInfo, QuoteRequest};
use crate::domain::quote_wizard::WizardLine;
use crate::domain::treatment::Treatment;
use crate::domain::treatment_plan::TreatmentPlan;
use crate::domain::types::{ClinicId, Money};
use crate::dto::catalog::PricedTreatment;
use crate::pagination::Paginated;

/// Totals of the wizard as shown on every step and by the summary API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WizardSummary {
    pub step: &'static str,
    pub lines: Vec<WizardLine>,
    pub promo_code: Option<String>,
    pub promo_label: Option<String>,
    pub patient: Option<PatientInfo>,
    pub clinic_id: Option<ClinicId>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub uk_total: Money,
    pub savings_percent: u32,
    /// Steps the wizard may currently jump to.
    pub reachable_steps: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct WizardPageData {
    pub summary: WizardSummary,
    pub treatments: Vec<Treatment>,
    pub categories: Vec<String>,
    pub clinics: Vec<Clinic>,
    pub packages: Vec<TreatmentPackage>,
}

#[derive(Debug, Serialize)]
pub struct QuoteListPage {
    pub quotes: Paginated<QuoteRequest>,
    pub status_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub plan: TreatmentPlan,
    pub total: Money,
    pub deposit: Money,
}

impl From<TreatmentPlan> for PlanView {
    fn from(plan: TreatmentPlan) -> Self {
        let total = plan.total();
        Self {
            deposit: crate::domain::pricing::deposit_for(total),
            total,
            plan,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotePageData {
    pub quote: QuoteRequest,
    pub clinic: Option<Clinic>,
    pub plans: Vec<PlanView>,
    pub uk_total: Money,
    pub savings_percent: u32,
    /// Clinic prices offered to the plan editor; empty for patients.
    pub price_list: Vec<PricedTreatment>,
}
