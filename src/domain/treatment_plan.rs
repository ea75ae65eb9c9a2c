//! Clinic-authored, versioned treatment plans answering a quote request.

use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ClinicId, Money, PlanId, PlanLineId, QuoteId, SafeText, TreatmentId, TypeConstraintError,
    UserId, ensure_range,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Editable by the clinic, invisible to the patient.
    Draft,
    Sent,
    Accepted,
    Rejected,
    /// Replaced by a newer version.
    Superseded,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Sent => "sent",
            PlanStatus::Accepted => "accepted",
            PlanStatus::Rejected => "rejected",
            PlanStatus::Superseded => "superseded",
        }
    }

    /// Statuses that a newer version replaces.
    pub fn is_open(self) -> bool {
        matches!(self, PlanStatus::Draft | PlanStatus::Sent)
    }
}

impl Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PlanStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(PlanStatus::Draft),
            "sent" => Ok(PlanStatus::Sent),
            "accepted" => Ok(PlanStatus::Accepted),
            "rejected" => Ok(PlanStatus::Rejected),
            "superseded" => Ok(PlanStatus::Superseded),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown plan status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlanLine {
    pub id: PlanLineId,
    pub plan_id: PlanId,
    pub treatment_id: Option<TreatmentId>,
    pub description: SafeText,
    pub quantity: i32,
    pub unit_price: Money,
}

impl TreatmentPlanLine {
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlan {
    pub id: PlanId,
    pub quote_id: QuoteId,
    pub clinic_id: ClinicId,
    pub patient_id: UserId,
    pub version: i32,
    pub status: PlanStatus,
    pub notes: Option<SafeText>,
    pub lines: Vec<TreatmentPlanLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TreatmentPlan {
    pub fn total(&self) -> Money {
        self.lines.iter().map(TreatmentPlanLine::total).sum()
    }
}

/// Line payload used both for new plans and line edits.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPlanLine {
    pub treatment_id: Option<TreatmentId>,
    pub description: SafeText,
    pub quantity: i32,
    pub unit_price: Money,
}

impl NewPlanLine {
    pub fn try_new(
        treatment_id: Option<TreatmentId>,
        description: SafeText,
        quantity: i32,
        unit_price: Money,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("quantity", i64::from(quantity), 1, 64)?;
        Ok(Self {
            treatment_id,
            description,
            quantity,
            unit_price,
        })
    }
}

/// A new plan version; the repository assigns the version number.
#[derive(Clone, Debug)]
pub struct NewTreatmentPlan {
    pub quote_id: QuoteId,
    pub clinic_id: ClinicId,
    pub patient_id: UserId,
    pub notes: Option<SafeText>,
    pub lines: Vec<NewPlanLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_statuses() {
        assert!(PlanStatus::Draft.is_open());
        assert!(PlanStatus::Sent.is_open());
        assert!(!PlanStatus::Accepted.is_open());
        assert!(!PlanStatus::Superseded.is_open());
    }

    #[test]
    fn line_quantity_is_bounded() {
        let description = SafeText::new("Zirconia crown").unwrap();
        assert!(NewPlanLine::try_new(None, description.clone(), 0, Money::ZERO).is_err());
        let line = NewPlanLine::try_new(None, description, 4, Money::from_pounds(180)).unwrap();
        assert_eq!(line.quantity, 4);
    }
}
