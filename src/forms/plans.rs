//! Treatment plan editor forms.

use serde::Deserialize;
use validator::Validate;

use crate::domain::treatment_plan::NewPlanLine;
use crate::domain::types::{Money, SafeText, TreatmentId};
use crate::forms::FormError;

/// Plan creation; line fields are parallel repeated inputs.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanForm {
    pub quote_id: i32,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    /// Zero marks a custom line without a catalog treatment.
    #[serde(default)]
    pub treatment_id: Vec<i32>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<i32>,
    #[serde(default)]
    pub unit_price: Vec<String>,
}

impl CreatePlanForm {
    pub fn lines(&self) -> Result<Vec<NewPlanLine>, FormError> {
        let count = self
            .description
            .len()
            .min(self.quantity.len())
            .min(self.unit_price.len());
        (0..count)
            .filter(|&i| !self.description[i].trim().is_empty())
            .map(|i| {
                let treatment_id = self.treatment_id.get(i).copied().unwrap_or_default();
                build_line(
                    treatment_id,
                    &self.description[i],
                    self.quantity[i],
                    &self.unit_price[i],
                )
            })
            .collect()
    }
}

/// Single line edit, used by the plan editor and the JSON API.
#[derive(Debug, Deserialize, Validate)]
pub struct PlanLineForm {
    pub treatment_id: Option<i32>,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1, max = 64))]
    pub quantity: i32,
    /// Pounds as text so `"180.50"` and `180.5` both arrive intact.
    pub unit_price: String,
}

impl PlanLineForm {
    pub fn to_new_line(&self) -> Result<NewPlanLine, FormError> {
        build_line(
            self.treatment_id.unwrap_or_default(),
            &self.description,
            self.quantity,
            &self.unit_price,
        )
    }
}

fn build_line(
    treatment_id: i32,
    description: &str,
    quantity: i32,
    unit_price: &str,
) -> Result<NewPlanLine, FormError> {
    let treatment_id = if treatment_id > 0 {
        Some(TreatmentId::new(treatment_id)?)
    } else {
        None
    };
    Ok(NewPlanLine::try_new(
        treatment_id,
        SafeText::new(description)?,
        quantity,
        Money::parse_pounds(unit_price)?,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rows_are_ignored() {
        let form = CreatePlanForm {
            quote_id: 3,
            notes: None,
            treatment_id: vec![5, 0],
            description: vec!["Implant".into(), "  ".into()],
            quantity: vec![2, 1],
            unit_price: vec!["450".into(), "0".into()],
        };
        let lines = form.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].treatment_id, Some(TreatmentId::new(5).unwrap()));
        assert_eq!(lines[0].unit_price, Money::from_pounds(450));
    }

    #[test]
    fn custom_line_has_no_treatment() {
        let form = PlanLineForm {
            treatment_id: Some(0),
            description: "Panoramic x-ray".into(),
            quantity: 1,
            unit_price: "35".into(),
        };
        assert!(form.to_new_line().unwrap().treatment_id.is_none());
    }
}
