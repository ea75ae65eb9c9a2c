//! Quote wizard step forms.

use serde::Deserialize;
use validator::Validate;

use crate::domain::quote::PatientInfo;
use crate::domain::types::{Email, PersonName, PhoneNumber, PromoCode, SafeText};
use crate::forms::{FormError, non_blank};
use crate::services::wizard::WizardNavigation;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddTreatmentForm {
    #[validate(range(min = 1))]
    pub treatment_id: i32,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 32))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityForm {
    #[validate(range(min = 1))]
    pub treatment_id: i32,
    /// Zero removes the line.
    #[validate(range(min = 0, max = 32))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTreatmentForm {
    pub treatment_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PromoForm {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
}

impl PromoForm {
    pub fn code(&self) -> Result<PromoCode, FormError> {
        Ok(PromoCode::new(self.code.as_str())?)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PatientInfoForm {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    /// `YYYY-MM` from an `<input type="month">`.
    pub travel_month: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

impl PatientInfoForm {
    pub fn to_patient_info(&self) -> Result<PatientInfo, FormError> {
        let phone = non_blank(&self.phone).map(PhoneNumber::new).transpose()?;
        Ok(PatientInfo {
            name: PersonName::new(self.name.as_str())?,
            email: Email::new(self.email.as_str())?,
            phone,
            travel_month: non_blank(&self.travel_month),
            notes: SafeText::optional(self.notes.clone())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ClinicChoiceForm {
    /// Absent or zero clears the selection.
    pub clinic_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StepForm {
    pub step: String,
}

impl StepForm {
    /// `next` and `back` move relative to the current step; anything else names a step.
    pub fn navigation(&self) -> WizardNavigation {
        match self.step.trim() {
            "next" => WizardNavigation::Next,
            "back" => WizardNavigation::Back,
            other => WizardNavigation::GoTo(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PackageChoiceForm {
    pub package_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_form_normalises_values() {
        let form = PatientInfoForm {
            name: " Jane Doe ".into(),
            email: "Jane@Example.com".into(),
            phone: Some("".into()),
            travel_month: Some("2026-11".into()),
            notes: Some("<script>x</script>Sensitive teeth".into()),
        };
        assert!(form.validate().is_ok());
        let info = form.to_patient_info().unwrap();
        assert_eq!(info.email.as_str(), "jane@example.com");
        assert!(info.phone.is_none());
        assert_eq!(info.notes.unwrap().as_str(), "Sensitive teeth");
    }

    #[test]
    fn step_form_maps_navigation() {
        let step = |raw: &str| StepForm { step: raw.into() }.navigation();
        assert_eq!(step("next"), WizardNavigation::Next);
        assert_eq!(step(" back "), WizardNavigation::Back);
        assert_eq!(step("review"), WizardNavigation::GoTo("review".into()));
    }

    #[test]
    fn quantity_range_is_enforced() {
        let form = AddTreatmentForm {
            treatment_id: 1,
            quantity: 33,
        };
        assert!(form.validate().is_err());
    }
}
