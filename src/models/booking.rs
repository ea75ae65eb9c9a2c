use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::booking::{
    Appointment as DomainAppointment, Booking as DomainBooking, BookingStatus,
    NewAppointment as DomainNewAppointment, NewBooking as DomainNewBooking,
    NewPayment as DomainNewPayment, Payment as DomainPayment, PaymentKind, PaymentStatus,
};
use crate::domain::types::{
    AppointmentId, BookingId, ClinicId, Money, PaymentId, PlanId, SafeText, Title,
    TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::bookings)]
/// Diesel model for [`crate::domain::booking::Booking`].
pub struct Booking {
    pub id: i32,
    pub reference: String,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub plan_id: i32,
    pub status: String,
    pub total: i64,
    pub deposit: i64,
    pub arrival_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking<'a> {
    pub reference: &'a str,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub plan_id: i32,
    pub status: &'a str,
    pub total: i64,
    pub deposit: i64,
    pub arrival_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::appointments)]
pub struct Appointment {
    pub id: i32,
    pub booking_id: i32,
    pub clinic_id: i32,
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::appointments)]
pub struct NewAppointment<'a> {
    pub booking_id: i32,
    pub clinic_id: i32,
    pub title: &'a str,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::payments)]
pub struct Payment {
    pub id: i32,
    pub booking_id: i32,
    pub amount: i64,
    pub kind: String,
    pub status: String,
    pub reference: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payments)]
pub struct NewPayment<'a> {
    pub booking_id: i32,
    pub amount: i64,
    pub kind: &'a str,
    pub status: &'a str,
    pub reference: Option<&'a str>,
}

impl TryFrom<Booking> for DomainBooking {
    type Error = TypeConstraintError;

    fn try_from(booking: Booking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BookingId::new(booking.id)?,
            reference: booking.reference,
            patient_id: UserId::new(booking.patient_id)?,
            clinic_id: ClinicId::new(booking.clinic_id)?,
            plan_id: PlanId::new(booking.plan_id)?,
            status: BookingStatus::try_from(booking.status.as_str())?,
            total: Money::from_pence(booking.total)?,
            deposit: Money::from_pence(booking.deposit)?,
            arrival_date: booking.arrival_date,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewBooking> for NewBooking<'a> {
    fn from(booking: &'a DomainNewBooking) -> Self {
        Self {
            reference: booking.reference.as_str(),
            patient_id: booking.patient_id.get(),
            clinic_id: booking.clinic_id.get(),
            plan_id: booking.plan_id.get(),
            status: BookingStatus::Pending.as_str(),
            total: booking.total.pence(),
            deposit: booking.deposit.pence(),
            arrival_date: booking.arrival_date,
        }
    }
}

impl TryFrom<Appointment> for DomainAppointment {
    type Error = TypeConstraintError;

    fn try_from(appointment: Appointment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId::new(appointment.id)?,
            booking_id: BookingId::new(appointment.booking_id)?,
            clinic_id: ClinicId::new(appointment.clinic_id)?,
            title: Title::new(appointment.title)?,
            starts_at: appointment.starts_at,
            duration_minutes: appointment.duration_minutes,
            notes: SafeText::optional(appointment.notes)?,
            created_at: appointment.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewAppointment> for NewAppointment<'a> {
    fn from(appointment: &'a DomainNewAppointment) -> Self {
        Self {
            booking_id: appointment.booking_id.get(),
            clinic_id: appointment.clinic_id.get(),
            title: appointment.title.as_str(),
            starts_at: appointment.starts_at,
            duration_minutes: appointment.duration_minutes,
            notes: appointment.notes.as_ref().map(SafeText::as_str),
        }
    }
}

impl TryFrom<Payment> for DomainPayment {
    type Error = TypeConstraintError;

    fn try_from(payment: Payment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PaymentId::new(payment.id)?,
            booking_id: BookingId::new(payment.booking_id)?,
            amount: Money::from_pence(payment.amount)?,
            kind: PaymentKind::try_from(payment.kind.as_str())?,
            status: PaymentStatus::try_from(payment.status.as_str())?,
            reference: payment.reference,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewPayment> for NewPayment<'a> {
    fn from(payment: &'a DomainNewPayment) -> Self {
        Self {
            booking_id: payment.booking_id.get(),
            amount: payment.amount.pence(),
            kind: payment.kind.as_str(),
            status: PaymentStatus::Pending.as_str(),
            reference: payment.reference.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unknown_booking_status_fails_conversion() {
        let now = Utc::now().naive_utc();
        let row = Booking {
            id: 1,
            reference: "ABCD2345".into(),
            patient_id: 1,
            clinic_id: 1,
            plan_id: 1,
            status: "paused".into(),
            total: 100,
            deposit: 20,
            arrival_date: None,
            created_at: now,
            updated_at: now,
        };
        assert!(DomainBooking::try_from(row).is_err());
    }

    #[test]
    fn new_payment_starts_pending() {
        let payment = DomainNewPayment {
            booking_id: BookingId::new(1).unwrap(),
            amount: Money::from_pounds(200),
            kind: PaymentKind::Deposit,
            reference: None,
        };
        let row = NewPayment::from(&payment);
        assert_eq!(row.status, "pending");
        assert_eq!(row.kind, "deposit");
        assert_eq!(row.amount, 20_000);
    }
}
