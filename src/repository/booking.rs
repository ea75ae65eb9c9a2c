//! Bookings with their appointments and payments.

use chrono::{NaiveDateTime, Utc};
use diesel::{dsl::exists, prelude::*};

use crate::{
    domain::{
        booking::{
            Appointment, Booking, BookingStatus, NewAppointment, NewPayment, Payment,
            PaymentStatus,
        },
        types::{AppointmentId, BookingId, ClinicId, PaymentId, UserId},
    },
    models::booking::{
        Appointment as DbAppointment, Booking as DbBooking, NewAppointment as DbNewAppointment,
        NewPayment as DbNewPayment, Payment as DbPayment,
    },
    repository::{
        BookingListQuery, BookingReader, BookingWriter, DieselRepository,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_payments(rows: Vec<DbPayment>) -> RepositoryResult<Vec<Payment>> {
    Ok(rows
        .into_iter()
        .map(Payment::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

fn into_appointments(rows: Vec<DbAppointment>) -> RepositoryResult<Vec<Appointment>> {
    Ok(rows
        .into_iter()
        .map(Appointment::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

impl BookingReader for DieselRepository {
    fn get_booking_by_id(&self, id: BookingId) -> RepositoryResult<Option<Booking>> {
        use crate::schema::bookings;

        let mut conn = self.conn()?;
        let db_booking = bookings::table
            .find(id.get())
            .first::<DbBooking>(&mut conn)
            .optional()?;

        Ok(db_booking.map(Booking::try_from).transpose()?)
    }

    fn get_booking_by_reference(&self, reference: &str) -> RepositoryResult<Option<Booking>> {
        use crate::schema::bookings;

        let mut conn = self.conn()?;
        let db_booking = bookings::table
            .filter(bookings::reference.eq(reference.to_ascii_uppercase()))
            .first::<DbBooking>(&mut conn)
            .optional()?;

        Ok(db_booking.map(Booking::try_from).transpose()?)
    }

    fn list_bookings(&self, query: BookingListQuery) -> RepositoryResult<(usize, Vec<Booking>)> {
        use crate::schema::bookings;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = bookings::table.into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(patient_id) = query.patient_id {
                items = items.filter(bookings::patient_id.eq(patient_id.get()));
            }
            if let Some(clinic_id) = query.clinic_id {
                items = items.filter(bookings::clinic_id.eq(clinic_id.get()));
            }
            if let Some(status) = query.status {
                items = items.filter(bookings::status.eq(status.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order((bookings::created_at.desc(), bookings::id.desc()));
        if let Some(pagination) = &query.pagination {
            items = items.limit(pagination.limit()).offset(pagination.offset());
        }
        let bookings = items
            .load::<DbBooking>(&mut conn)?
            .into_iter()
            .map(Booking::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, bookings))
    }

    fn clinic_has_patient(
        &self,
        clinic_ids: &[ClinicId],
        patient_id: UserId,
    ) -> RepositoryResult<bool> {
        use crate::schema::bookings;

        if clinic_ids.is_empty() {
            return Ok(false);
        }
        let ids: Vec<i32> = clinic_ids.iter().map(|id| id.get()).collect();
        let mut conn = self.conn()?;
        let found = diesel::select(exists(
            bookings::table
                .filter(bookings::clinic_id.eq_any(ids))
                .filter(bookings::patient_id.eq(patient_id.get())),
        ))
        .get_result::<bool>(&mut conn)?;
        Ok(found)
    }

    fn list_appointments(&self, booking_id: BookingId) -> RepositoryResult<Vec<Appointment>> {
        use crate::schema::appointments;

        let mut conn = self.conn()?;
        let rows = appointments::table
            .filter(appointments::booking_id.eq(booking_id.get()))
            .order(appointments::starts_at.asc())
            .load::<DbAppointment>(&mut conn)?;

        into_appointments(rows)
    }

    fn list_clinic_appointments(
        &self,
        clinic_id: ClinicId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>> {
        use crate::schema::appointments;

        let mut conn = self.conn()?;
        let rows = appointments::table
            .filter(appointments::clinic_id.eq(clinic_id.get()))
            .filter(appointments::starts_at.ge(from))
            .filter(appointments::starts_at.lt(to))
            .order(appointments::starts_at.asc())
            .load::<DbAppointment>(&mut conn)?;

        into_appointments(rows)
    }

    fn get_payment_by_id(&self, id: PaymentId) -> RepositoryResult<Option<Payment>> {
        use crate::schema::payments;

        let mut conn = self.conn()?;
        let db_payment = payments::table
            .find(id.get())
            .first::<DbPayment>(&mut conn)
            .optional()?;

        Ok(db_payment.map(Payment::try_from).transpose()?)
    }

    fn list_payments(&self, booking_id: BookingId) -> RepositoryResult<Vec<Payment>> {
        use crate::schema::payments;

        let mut conn = self.conn()?;
        let rows = payments::table
            .filter(payments::booking_id.eq(booking_id.get()))
            .order(payments::created_at.asc())
            .load::<DbPayment>(&mut conn)?;

        into_payments(rows)
    }

    fn list_payments_by_status(
        &self,
        status: Option<PaymentStatus>,
    ) -> RepositoryResult<Vec<Payment>> {
        use crate::schema::payments;

        let mut conn = self.conn()?;
        let mut query = payments::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(payments::status.eq(status.as_str()));
        }
        let rows = query
            .order(payments::created_at.desc())
            .load::<DbPayment>(&mut conn)?;

        into_payments(rows)
    }
}

impl BookingWriter for DieselRepository {
    fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking> {
        use crate::schema::bookings;

        let mut conn = self.conn()?;
        let db_booking = diesel::update(bookings::table.find(id.get()))
            .set((
                bookings::status.eq(status.as_str()),
                bookings::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<DbBooking>(&mut conn)?;

        Ok(Booking::try_from(db_booking)?)
    }

    fn create_appointment(&self, appointment: &NewAppointment) -> RepositoryResult<Appointment> {
        use crate::schema::appointments;

        let mut conn = self.conn()?;
        let db_new_appointment: DbNewAppointment = appointment.into();
        let db_appointment = diesel::insert_into(appointments::table)
            .values(&db_new_appointment)
            .get_result::<DbAppointment>(&mut conn)?;

        Ok(Appointment::try_from(db_appointment)?)
    }

    fn delete_appointment(&self, id: AppointmentId) -> RepositoryResult<()> {
        use crate::schema::appointments;

        let mut conn = self.conn()?;
        let affected = diesel::delete(appointments::table.find(id.get())).execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn create_payment(&self, payment: &NewPayment) -> RepositoryResult<Payment> {
        use crate::schema::payments;

        let mut conn = self.conn()?;
        let db_new_payment: DbNewPayment = payment.into();
        let db_payment = diesel::insert_into(payments::table)
            .values(&db_new_payment)
            .get_result::<DbPayment>(&mut conn)?;

        Ok(Payment::try_from(db_payment)?)
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> RepositoryResult<Payment> {
        use crate::schema::payments;

        let mut conn = self.conn()?;
        let db_payment = diesel::update(payments::table.find(id.get()))
            .set((
                payments::status.eq(status.as_str()),
                payments::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<DbPayment>(&mut conn)?;

        Ok(Payment::try_from(db_payment)?)
    }
}
