//! Bookings, their appointment schedule and payments.

use std::fmt::Display;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    AppointmentId, BookingId, ClinicId, Money, PaymentId, PlanId, SafeText, Title,
    TypeConstraintError, UserId, ensure_range,
};

pub const REFERENCE_LEN: usize = 8;
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random booking reference such as `K7QM2ZPA`.
pub fn generate_reference() -> String {
    (0..REFERENCE_LEN)
        .map(|_| REFERENCE_ALPHABET[rand::random_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for BookingStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "in_progress" => Ok(BookingStatus::InProgress),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub reference: String,
    pub patient_id: UserId,
    pub clinic_id: ClinicId,
    pub plan_id: PlanId,
    pub status: BookingStatus,
    pub total: Money,
    pub deposit: Money,
    pub arrival_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Booking created when a patient accepts a sent plan.
#[derive(Clone, Debug)]
pub struct NewBooking {
    pub reference: String,
    pub patient_id: UserId,
    pub clinic_id: ClinicId,
    pub plan_id: PlanId,
    pub total: Money,
    pub deposit: Money,
    pub arrival_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub booking_id: BookingId,
    pub clinic_id: ClinicId,
    pub title: Title,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<SafeText>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Clone, Debug)]
pub struct NewAppointment {
    pub booking_id: BookingId,
    pub clinic_id: ClinicId,
    pub title: Title,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<SafeText>,
}

impl NewAppointment {
    pub fn try_new(
        booking_id: BookingId,
        clinic_id: ClinicId,
        title: Title,
        starts_at: NaiveDateTime,
        duration_minutes: i32,
        notes: Option<SafeText>,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("duration", i64::from(duration_minutes), 5, 600)?;
        Ok(Self {
            booking_id,
            clinic_id,
            title,
            starts_at,
            duration_minutes,
            notes,
        })
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open interval overlap with an existing appointment.
    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.starts_at < other.ends_at() && other.starts_at < self.ends_at()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Deposit,
    Balance,
    Refund,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentKind::Deposit => "deposit",
            PaymentKind::Balance => "balance",
            PaymentKind::Refund => "refund",
        }
    }
}

impl TryFrom<&str> for PaymentKind {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(PaymentKind::Deposit),
            "balance" => Ok(PaymentKind::Balance),
            "refund" => Ok(PaymentKind::Refund),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown payment kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Succeeded) | (Pending, Failed) | (Succeeded, Refunded)
        )
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewPayment {
    pub booking_id: BookingId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub reference: Option<String>,
}

/// Amount still owed on a booking given its payment history.
///
/// Succeeded deposits and balances reduce the amount; succeeded refunds and
/// refunded payments give it back.
pub fn balance_due(total: Money, payments: &[Payment]) -> Money {
    let paid: Money = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Succeeded && p.kind != PaymentKind::Refund)
        .map(|p| p.amount)
        .sum();
    let refunded: Money = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Succeeded && p.kind == PaymentKind::Refund)
        .map(|p| p.amount)
        .sum();
    total.saturating_add(refunded).saturating_sub(paid)
}

/// Confirmed arrival date must not be in the past relative to `today`.
pub fn validate_arrival(
    arrival: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), TypeConstraintError> {
    match arrival {
        Some(date) if date < today => Err(TypeConstraintError::InvalidValue(
            "arrival date is in the past".to_string(),
        )),
        _ => Ok(()),
    }
}
