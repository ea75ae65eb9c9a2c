//! Multi-step quote builder.
//!
//! The wizard walks a patient through four ordered steps:
//! treatments → promo → patient info → review. State lives in an owned
//! [`QuoteWizard`] value; callers persist it explicitly through
//! [`QuoteWizard::to_snapshot`] and [`QuoteWizard::restore_or_default`]
//! (the HTTP layer keeps the snapshot in a server-side draft).

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pricing::{self, PromoDiscount};
use crate::domain::quote::PatientInfo;
use crate::domain::types::{ClinicId, Money, PromoCode, TreatmentId, TreatmentName};

/// Snapshot layout version; older or newer snapshots are discarded.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Upper bound for a single line quantity (e.g. a full arch of veneers).
pub const MAX_QUANTITY: i32 = 32;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    #[default]
    Treatments,
    Promo,
    PatientInfo,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Treatments,
        WizardStep::Promo,
        WizardStep::PatientInfo,
        WizardStep::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Treatments => "treatments",
            WizardStep::Promo => "promo",
            WizardStep::PatientInfo => "patient-info",
            WizardStep::Review => "review",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl TryFrom<&str> for WizardStep {
    type Error = WizardError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == value)
            .ok_or_else(|| WizardError::UnknownStep(value.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("add at least one treatment to continue")]
    EmptyTreatments,
    #[error("enter your contact details to continue")]
    MissingPatientInfo,
    #[error("quantity must be between 1 and {max}, got {0}", max = MAX_QUANTITY)]
    InvalidQuantity(i32),
    #[error("treatment {0} is not part of this quote")]
    UnknownTreatment(TreatmentId),
    #[error("already at the first step")]
    AlreadyFirstStep,
    #[error("already at the last step")]
    AlreadyLastStep,
    #[error("step {0} is not available yet")]
    StepLocked(&'static str),
    #[error("unknown step: {0}")]
    UnknownStep(String),
    #[error("the quote is not ready to submit")]
    NotReady,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Treatment line held by the wizard.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WizardLine {
    pub treatment_id: TreatmentId,
    pub name: TreatmentName,
    pub unit_price: Money,
    pub quantity: i32,
}

impl WizardLine {
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppliedPromo {
    pub code: PromoCode,
    pub discount: PromoDiscount,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteWizard {
    pub step: WizardStep,
    pub lines: Vec<WizardLine>,
    pub promo: Option<AppliedPromo>,
    pub patient: Option<PatientInfo>,
    pub clinic_id: Option<ClinicId>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: NaiveDateTime,
    state: QuoteWizard,
}

fn check_quantity(quantity: i32) -> Result<(), WizardError> {
    if (1..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(WizardError::InvalidQuantity(quantity))
    }
}

impl QuoteWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a treatment; adding one already present increases its quantity.
    pub fn add_treatment(&mut self, line: WizardLine) -> Result<(), WizardError> {
        check_quantity(line.quantity)?;
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.treatment_id == line.treatment_id)
        {
            Some(existing) => {
                let quantity = existing.quantity + line.quantity;
                check_quantity(quantity)?;
                existing.quantity = quantity;
                existing.unit_price = line.unit_price;
                existing.name = line.name;
            }
            None => self.lines.push(line),
        }
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn set_quantity(
        &mut self,
        treatment_id: TreatmentId,
        quantity: i32,
    ) -> Result<(), WizardError> {
        if quantity == 0 {
            return self.remove_treatment(treatment_id);
        }
        check_quantity(quantity)?;
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.treatment_id == treatment_id)
            .ok_or(WizardError::UnknownTreatment(treatment_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_treatment(&mut self, treatment_id: TreatmentId) -> Result<(), WizardError> {
        let before = self.lines.len();
        self.lines.retain(|line| line.treatment_id != treatment_id);
        if self.lines.len() == before {
            return Err(WizardError::UnknownTreatment(treatment_id));
        }
        if self.lines.is_empty() {
            self.step = WizardStep::Treatments;
        }
        Ok(())
    }

    /// Applies a promo code. Re-applying the same code changes nothing.
    pub fn apply_promo(&mut self, code: PromoCode, discount: PromoDiscount) {
        self.promo = Some(AppliedPromo { code, discount });
    }

    pub fn clear_promo(&mut self) {
        self.promo = None;
    }

    pub fn set_patient(&mut self, patient: PatientInfo) {
        self.patient = Some(patient);
    }

    /// Selects a clinic and reprices lines with `price_of`.
    ///
    /// Lines the pricing function cannot price keep their previous price.
    pub fn select_clinic<F>(&mut self, clinic_id: Option<ClinicId>, price_of: F)
    where
        F: Fn(TreatmentId) -> Option<Money>,
    {
        self.clinic_id = clinic_id;
        for line in &mut self.lines {
            match price_of(line.treatment_id) {
                Some(price) => line.unit_price = price,
                None => log::warn!(
                    "No price for treatment {} while repricing the quote",
                    line.treatment_id
                ),
            }
        }
    }

    /// Whether every step before `step` is satisfied.
    pub fn can_enter(&self, step: WizardStep) -> bool {
        self.gate_before(step).is_ok()
    }

    fn gate_before(&self, step: WizardStep) -> Result<(), WizardError> {
        if step > WizardStep::Treatments && self.lines.is_empty() {
            return Err(WizardError::EmptyTreatments);
        }
        if step > WizardStep::PatientInfo && self.patient.is_none() {
            return Err(WizardError::MissingPatientInfo);
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        let next = self.step.next().ok_or(WizardError::AlreadyLastStep)?;
        self.gate_before(next)?;
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self.step.previous().ok_or(WizardError::AlreadyFirstStep)?;
        self.step = previous;
        Ok(previous)
    }

    pub fn go_to(&mut self, step: WizardStep) -> Result<(), WizardError> {
        if !self.can_enter(step) {
            return Err(WizardError::StepLocked(step.as_str()));
        }
        self.step = step;
        Ok(())
    }

    /// Ready for submission: on the review step with every gate satisfied.
    pub fn ensure_ready(&self) -> Result<(), WizardError> {
        if self.step != WizardStep::Review {
            return Err(WizardError::NotReady);
        }
        self.gate_before(WizardStep::Review)
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(WizardLine::total).sum()
    }

    pub fn discount(&self) -> Money {
        match &self.promo {
            Some(promo) => pricing::discount_for(self.subtotal(), promo.discount),
            None => Money::ZERO,
        }
    }

    pub fn total(&self) -> Money {
        self.subtotal().saturating_sub(self.discount())
    }

    pub fn uk_total(&self) -> Money {
        pricing::uk_price(self.subtotal())
    }

    pub fn savings_percent(&self) -> u32 {
        pricing::savings_percent(self.total(), self.uk_total())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Serializes the wizard into a versioned JSON snapshot.
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        self.to_snapshot_at(Utc::now().naive_utc())
    }

    pub fn to_snapshot_at(&self, saved_at: NaiveDateTime) -> Result<String, SnapshotError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at,
            state: self.clone(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    pub fn from_snapshot(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        let mut wizard = snapshot.state;
        // A snapshot written by an older build may point past an unmet gate.
        if !wizard.can_enter(wizard.step) {
            wizard.step = WizardStep::Treatments;
        }
        Ok(wizard)
    }

    /// Restores a stored snapshot, falling back to a fresh wizard.
    pub fn restore_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => Self::from_snapshot(raw).unwrap_or_else(|err| {
                log::warn!("Discarding quote wizard snapshot: {err}");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Email, PersonName};

    fn line(id: i32, pounds: i64, quantity: i32) -> WizardLine {
        WizardLine {
            treatment_id: TreatmentId::new(id).unwrap(),
            name: TreatmentName::new(format!("Treatment {id}")).unwrap(),
            unit_price: Money::from_pounds(pounds),
            quantity,
        }
    }

    fn patient() -> PatientInfo {
        PatientInfo {
            name: PersonName::new("Jane Doe").unwrap(),
            email: Email::new("jane@example.com").unwrap(),
            phone: None,
            travel_month: Some("2026-11".into()),
            notes: None,
        }
    }

    #[test]
    fn adding_same_treatment_merges_quantity() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 100, 2)).unwrap();
        wizard.add_treatment(line(1, 110, 3)).unwrap();
        assert_eq!(wizard.lines.len(), 1);
        assert_eq!(wizard.lines[0].quantity, 5);
        assert_eq!(wizard.subtotal(), Money::from_pounds(550));
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        let mut wizard = QuoteWizard::new();
        assert_eq!(
            wizard.add_treatment(line(1, 100, 0)),
            Err(WizardError::InvalidQuantity(0))
        );
        wizard.add_treatment(line(1, 100, MAX_QUANTITY)).unwrap();
        assert_eq!(
            wizard.add_treatment(line(1, 100, 1)),
            Err(WizardError::InvalidQuantity(MAX_QUANTITY + 1))
        );
        assert_eq!(wizard.lines[0].quantity, MAX_QUANTITY);
    }

    #[test]
    fn cannot_leave_treatments_empty() {
        let mut wizard = QuoteWizard::new();
        assert_eq!(wizard.next(), Err(WizardError::EmptyTreatments));
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        assert_eq!(wizard.next(), Ok(WizardStep::Promo));
        assert_eq!(wizard.next(), Ok(WizardStep::PatientInfo));
        assert_eq!(wizard.next(), Err(WizardError::MissingPatientInfo));
        wizard.set_patient(patient());
        assert_eq!(wizard.next(), Ok(WizardStep::Review));
        assert_eq!(wizard.next(), Err(WizardError::AlreadyLastStep));
        assert!(wizard.ensure_ready().is_ok());
    }

    #[test]
    fn back_stops_at_first_step() {
        let mut wizard = QuoteWizard::new();
        assert_eq!(wizard.back(), Err(WizardError::AlreadyFirstStep));
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.back(), Ok(WizardStep::Treatments));
    }

    #[test]
    fn go_to_respects_gates() {
        let mut wizard = QuoteWizard::new();
        assert_eq!(
            wizard.go_to(WizardStep::Review),
            Err(WizardError::StepLocked("review"))
        );
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        assert!(wizard.go_to(WizardStep::PatientInfo).is_ok());
        assert!(wizard.go_to(WizardStep::Review).is_err());
    }

    #[test]
    fn removing_last_line_returns_to_treatments() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        wizard.next().unwrap();
        wizard.remove_treatment(TreatmentId::new(1).unwrap()).unwrap();
        assert_eq!(wizard.step, WizardStep::Treatments);
        assert_eq!(
            wizard.remove_treatment(TreatmentId::new(1).unwrap()),
            Err(WizardError::UnknownTreatment(TreatmentId::new(1).unwrap()))
        );
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        wizard.add_treatment(line(2, 50, 1)).unwrap();
        wizard.set_quantity(TreatmentId::new(2).unwrap(), 0).unwrap();
        assert_eq!(wizard.lines.len(), 1);
        wizard.set_quantity(TreatmentId::new(1).unwrap(), 4).unwrap();
        assert_eq!(wizard.subtotal(), Money::from_pounds(400));
    }

    #[test]
    fn applying_same_promo_twice_is_idempotent() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 1000, 1)).unwrap();
        let code = PromoCode::new("welcome10").unwrap();
        wizard.apply_promo(code.clone(), PromoDiscount::Percent(10));
        let first = wizard.total();
        wizard.apply_promo(code, PromoDiscount::Percent(10));
        assert_eq!(wizard.total(), first);
        assert_eq!(first, Money::from_pounds(900));
        wizard.clear_promo();
        assert_eq!(wizard.total(), Money::from_pounds(1000));
    }

    #[test]
    fn totals_include_uk_comparison() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 400, 1)).unwrap();
        assert_eq!(wizard.uk_total(), Money::from_pounds(1000));
        assert_eq!(wizard.savings_percent(), 60);
    }

    #[test]
    fn select_clinic_reprices_known_lines() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 100, 1)).unwrap();
        wizard.add_treatment(line(2, 100, 1)).unwrap();
        let clinic = ClinicId::new(9).unwrap();
        wizard.select_clinic(Some(clinic), |id| {
            (id.get() == 1).then(|| Money::from_pounds(80))
        });
        assert_eq!(wizard.clinic_id, Some(clinic));
        assert_eq!(wizard.lines[0].unit_price, Money::from_pounds(80));
        assert_eq!(wizard.lines[1].unit_price, Money::from_pounds(100));
    }

    #[test]
    fn snapshot_restores_state() {
        let mut wizard = QuoteWizard::new();
        wizard.add_treatment(line(1, 100, 2)).unwrap();
        wizard.apply_promo(PromoCode::new("SUMMER15").unwrap(), PromoDiscount::Percent(15));
        wizard.next().unwrap();
        let raw = wizard.to_snapshot().unwrap();
        let restored = QuoteWizard::restore_or_default(Some(&raw));
        assert_eq!(restored, wizard);
    }

    #[test]
    fn corrupt_snapshot_yields_fresh_wizard() {
        assert_eq!(
            QuoteWizard::restore_or_default(Some("{not json")),
            QuoteWizard::default()
        );
        let future = r#"{"version":99,"saved_at":"2026-01-01T00:00:00","state":{"step":"treatments","lines":[],"promo":null,"patient":null,"clinic_id":null}}"#;
        assert!(matches!(
            QuoteWizard::from_snapshot(future),
            Err(SnapshotError::UnsupportedVersion(99))
        ));
        assert_eq!(QuoteWizard::restore_or_default(None), QuoteWizard::default());
    }

    #[test]
    fn snapshot_past_unmet_gate_rewinds() {
        let raw = r#"{"version":1,"saved_at":"2026-01-01T00:00:00","state":{"step":"review","lines":[],"promo":null,"patient":null,"clinic_id":null}}"#;
        let wizard = QuoteWizard::from_snapshot(raw).unwrap();
        assert_eq!(wizard.step, WizardStep::Treatments);
    }
}
