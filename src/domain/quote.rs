//! Quote requests submitted by patients.

use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ClinicId, Email, Money, PersonName, PhoneNumber, PromoCode, QuoteId, QuoteLineId, SafeText,
    TreatmentId, TreatmentName, TypeConstraintError, UserId,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Waiting for a clinic to send a treatment plan.
    Pending,
    /// At least one treatment plan has been sent.
    Quoted,
    /// The patient accepted a plan and a booking exists.
    Accepted,
    /// The patient rejected every plan.
    Declined,
    Cancelled,
}

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Quoted => "quoted",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
            QuoteStatus::Cancelled => "cancelled",
        }
    }

    /// Patients may withdraw a quote until they accept a plan.
    pub fn is_cancellable(self) -> bool {
        matches!(self, QuoteStatus::Pending | QuoteStatus::Quoted)
    }
}

impl Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for QuoteStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(QuoteStatus::Pending),
            "quoted" => Ok(QuoteStatus::Quoted),
            "accepted" => Ok(QuoteStatus::Accepted),
            "declined" => Ok(QuoteStatus::Declined),
            "cancelled" => Ok(QuoteStatus::Cancelled),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown quote status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuoteLine {
    pub id: QuoteLineId,
    pub treatment_id: TreatmentId,
    pub name: TreatmentName,
    pub unit_price: Money,
    pub quantity: i32,
}

impl QuoteLine {
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Contact details captured in the patient-info wizard step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientInfo {
    pub name: PersonName,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    /// Free form, e.g. `2026-11` or `November`.
    pub travel_month: Option<String>,
    pub notes: Option<SafeText>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuoteRequest {
    pub id: QuoteId,
    pub patient_id: UserId,
    pub clinic_id: Option<ClinicId>,
    pub status: QuoteStatus,
    pub promo_code: Option<PromoCode>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub patient: PatientInfo,
    pub lines: Vec<QuoteLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewQuoteLine {
    pub treatment_id: TreatmentId,
    pub name: TreatmentName,
    pub unit_price: Money,
    pub quantity: i32,
}

#[derive(Clone, Debug)]
pub struct NewQuoteRequest {
    pub patient_id: UserId,
    pub clinic_id: Option<ClinicId>,
    pub promo_code: Option<PromoCode>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub patient: PatientInfo,
    pub lines: Vec<NewQuoteLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            QuoteStatus::Pending,
            QuoteStatus::Quoted,
            QuoteStatus::Accepted,
            QuoteStatus::Declined,
            QuoteStatus::Cancelled,
        ] {
            assert_eq!(QuoteStatus::try_from(status.as_str()), Ok(status));
        }
        assert!(QuoteStatus::try_from("archived").is_err());
    }

    #[test]
    fn only_open_quotes_are_cancellable() {
        assert!(QuoteStatus::Pending.is_cancellable());
        assert!(QuoteStatus::Quoted.is_cancellable());
        assert!(!QuoteStatus::Accepted.is_cancellable());
    }
}
