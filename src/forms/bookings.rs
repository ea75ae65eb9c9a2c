//! Booking lifecycle, appointment, payment and hotel forms.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::booking::{BookingStatus, NewAppointment, NewPayment, PaymentKind, PaymentStatus};
use crate::domain::hotel::HotelBookingStatus;
use crate::domain::types::{BookingId, ClinicId, Money, SafeText, Title};
use crate::forms::{FormError, non_blank, parse_datetime_local, parse_optional_date};

#[derive(Debug, Deserialize)]
pub struct AcceptPlanForm {
    pub arrival_date: Option<String>,
}

impl AcceptPlanForm {
    pub fn arrival_date(&self) -> Result<Option<NaiveDate>, FormError> {
        parse_optional_date(&self.arrival_date)
    }
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusForm {
    pub status: String,
}

impl BookingStatusForm {
    pub fn status(&self) -> Result<BookingStatus, FormError> {
        BookingStatus::try_from(self.status.as_str())
            .map_err(|_| FormError::InvalidStatus(self.status.clone()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppointmentForm {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub starts_at: String,
    #[validate(range(min = 5, max = 600))]
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

impl AppointmentForm {
    pub fn to_new_appointment(
        &self,
        booking_id: BookingId,
        clinic_id: ClinicId,
    ) -> Result<NewAppointment, FormError> {
        Ok(NewAppointment::try_new(
            booking_id,
            clinic_id,
            Title::new(self.title.as_str())?,
            parse_datetime_local(&self.starts_at)?,
            self.duration_minutes,
            SafeText::optional(self.notes.clone())?,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub amount: String,
    pub kind: String,
    pub reference: Option<String>,
}

impl PaymentForm {
    pub fn to_new_payment(&self, booking_id: BookingId) -> Result<NewPayment, FormError> {
        let amount = Money::parse_pounds(&self.amount)?;
        if amount.is_zero() {
            return Err(FormError::Constraint(
                crate::domain::types::TypeConstraintError::InvalidValue(
                    "payment amount must be positive".to_string(),
                ),
            ));
        }
        Ok(NewPayment {
            booking_id,
            amount,
            kind: PaymentKind::try_from(self.kind.as_str())?,
            reference: non_blank(&self.reference),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusForm {
    pub status: String,
}

impl PaymentStatusForm {
    pub fn status(&self) -> Result<PaymentStatus, FormError> {
        PaymentStatus::try_from(self.status.as_str())
            .map_err(|_| FormError::InvalidStatus(self.status.clone()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct HotelStayForm {
    pub hotel_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, max = 6))]
    pub guests: i32,
}

#[derive(Debug, Deserialize)]
pub struct HotelStayStatusForm {
    pub status: String,
}

impl HotelStayStatusForm {
    pub fn status(&self) -> Result<HotelBookingStatus, FormError> {
        HotelBookingStatus::try_from(self.status.as_str())
            .map_err(|_| FormError::InvalidStatus(self.status.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_form_parses_local_datetime() {
        let form = AppointmentForm {
            title: "Implant placement".into(),
            starts_at: "2026-11-04T10:00".into(),
            duration_minutes: 90,
            notes: None,
        };
        let appointment = form
            .to_new_appointment(BookingId::new(1).unwrap(), ClinicId::new(2).unwrap())
            .unwrap();
        assert_eq!(appointment.ends_at().to_string(), "2026-11-04 11:30:00");
    }

    #[test]
    fn zero_payments_are_rejected() {
        let form = PaymentForm {
            amount: "0".into(),
            kind: "deposit".into(),
            reference: None,
        };
        assert!(form.to_new_payment(BookingId::new(1).unwrap()).is_err());
    }

    #[test]
    fn unknown_status_is_reported() {
        let form = BookingStatusForm {
            status: "teleported".into(),
        };
        assert!(matches!(form.status(), Err(FormError::InvalidStatus(_))));
    }
}
