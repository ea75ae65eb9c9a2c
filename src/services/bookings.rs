//! Booking lifecycle, schedule, payments and hotel stays.

use chrono::Duration;
use validator::Validate;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser, PATIENT_ROLE};
use crate::domain::booking::{
    Appointment, Booking, BookingStatus, PaymentKind, Payment, PaymentStatus, balance_due,
};
use crate::domain::clinic::Clinic;
use crate::domain::hotel::{Hotel, HotelBooking, HotelBookingStatus, NewHotelBooking};
use crate::domain::types::{AppointmentId, BookingId, CityName, HotelBookingId, HotelId, PaymentId};
use crate::domain::user::User;
use crate::dto::ListQuery;
use crate::dto::bookings::{BookingListPage, BookingPageData, BookingViewer};
use crate::forms::bookings::{
    AppointmentForm, BookingStatusForm, HotelStayForm, HotelStayStatusForm, PaymentForm,
    PaymentStatusForm,
};
use crate::models::zmq::DentalEvent;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use crate::repository::{
    BookingListQuery, BookingReader, BookingWriter, ClinicReader, HotelReader, HotelWriter,
    MessageReader, MessageWriter, PlanReader, UserReader, UserWriter,
};
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::{
    booking_counterparts, current_user, ensure_clinic_access, resolve_staff_clinic,
};
use crate::services::{ServiceError, ServiceResult, ensure_role};

pub const ALL_STATUSES: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::InProgress,
    BookingStatus::Completed,
    BookingStatus::Cancelled,
];

/// Longest appointment, used to widen the overlap lookup window.
const MAX_APPOINTMENT_MINUTES: i64 = 600;

fn status_filter(raw: &Option<String>) -> Option<BookingStatus> {
    let raw = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    BookingStatus::try_from(raw)
        .map_err(|err| log::warn!("Ignoring booking status filter: {err}"))
        .ok()
}

fn list_page<R>(
    repo: &R,
    query: &ListQuery,
    list_query: BookingListQuery,
) -> ServiceResult<BookingListPage>
where
    R: BookingReader + ?Sized,
{
    let page = query.page.unwrap_or(1);
    let status = status_filter(&query.status);
    let mut list_query = list_query.paginate(page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = status {
        list_query = list_query.status(status);
    }
    let (total, bookings) = repo.list_bookings(list_query)?;
    Ok(BookingListPage {
        bookings: Paginated::new(bookings, page, total, DEFAULT_ITEMS_PER_PAGE),
        status_filter: status.map(|s| s.as_str().to_string()),
    })
}

pub fn load_booking_record<R>(repo: &R, booking_id: i32) -> ServiceResult<Booking>
where
    R: BookingReader + ?Sized,
{
    repo.get_booking_by_id(BookingId::new(booking_id)?)?
        .ok_or(ServiceError::NotFound)
}

/// Relation of the user to the booking; outsiders get `NotFound`.
pub fn booking_viewer<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking: &Booking,
) -> ServiceResult<(User, BookingViewer)>
where
    R: UserReader + UserWriter + ClinicReader + ?Sized,
{
    let local = current_user(repo, user)?;
    if user.is_admin() {
        return Ok((local, BookingViewer::Admin));
    }
    if local.id == booking.patient_id {
        return Ok((local, BookingViewer::Patient));
    }
    match ensure_clinic_access(repo, user, booking.clinic_id) {
        Ok(()) => Ok((local, BookingViewer::Clinic)),
        Err(ServiceError::Unauthorized) => Err(ServiceError::NotFound),
        Err(err) => Err(err),
    }
}

/// Statuses `viewer` may move the booking to from `current`.
pub fn next_statuses(current: BookingStatus, viewer: BookingViewer) -> Vec<BookingStatus> {
    ALL_STATUSES
        .into_iter()
        .filter(|next| current.can_transition_to(*next))
        .filter(|next| viewer != BookingViewer::Patient || *next == BookingStatus::Cancelled)
        .collect()
}

pub fn list_patient_bookings<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<BookingListPage>
where
    R: UserReader + UserWriter + BookingReader + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    let local = current_user(repo, user)?;
    list_page(repo, &query, BookingListQuery::default().patient(local.id))
}

pub fn list_clinic_bookings<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<(Clinic, Vec<Clinic>, BookingListPage)>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + ?Sized,
{
    let (clinic, clinics) = resolve_staff_clinic(repo, user, query.clinic)?;
    let page = list_page(repo, &query, BookingListQuery::default().clinic(clinic.id))?;
    Ok((clinic, clinics, page))
}

pub fn list_all_bookings<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<BookingListPage>
where
    R: BookingReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    list_page(repo, &query, BookingListQuery::default())
}

/// Full booking page; opening it marks the thread as read for the viewer.
pub fn load_booking<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
) -> ServiceResult<BookingPageData>
where
    R: UserReader
        + UserWriter
        + ClinicReader
        + BookingReader
        + PlanReader
        + HotelReader
        + MessageReader
        + MessageWriter
        + ?Sized,
{
    let booking = load_booking_record(repo, booking_id)?;
    let (local, viewer) = booking_viewer(repo, user, &booking)?;

    let clinic = repo.get_clinic_by_id(booking.clinic_id)?;
    let plan = repo.get_plan_by_id(booking.plan_id)?;
    let appointments = repo.list_appointments(booking.id)?;
    let payments = repo.list_payments(booking.id)?;
    let hotel_stays = repo.list_hotel_bookings(booking.id)?;
    let city = clinic.as_ref().map(|clinic| clinic.city.clone());
    let hotels = repo.list_hotels(city, true)?;

    if viewer != BookingViewer::Admin {
        repo.mark_messages_read(booking.id, local.id, chrono::Utc::now().naive_utc())?;
    }
    let messages = repo.list_messages(booking.id)?;

    Ok(BookingPageData {
        balance_due: balance_due(booking.total, &payments),
        next_statuses: next_statuses(booking.status, viewer)
            .into_iter()
            .map(BookingStatus::as_str)
            .collect(),
        booking,
        clinic,
        plan,
        appointments,
        payments,
        hotel_stays,
        hotels,
        messages,
        viewer,
    })
}

/// Moves the booking along its lifecycle. Patients may only cancel.
pub fn change_status<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    booking_id: i32,
    form: BookingStatusForm,
) -> ServiceResult<Booking>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + BookingWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    let next = form.status()?;
    let booking = load_booking_record(repo, booking_id)?;
    let (local, viewer) = booking_viewer(repo, user, &booking)?;

    if !next_statuses(booking.status, viewer).contains(&next) {
        return Err(ServiceError::Conflict(format!(
            "Booking {} cannot move from {} to {}.",
            booking.reference, booking.status, next
        )));
    }
    let updated = repo.update_booking_status(booking.id, next).map_err(|err| {
        log::error!("Failed to update booking {}: {err}", booking.reference);
        ServiceError::from(err)
    })?;
    log::info!(
        "Booking {} moved to {} by {}",
        updated.reference,
        updated.status,
        user.email
    );
    publish_quietly(
        publisher,
        DentalEvent::BookingStatusChanged {
            booking_id: updated.id.get(),
            reference: updated.reference.clone(),
            status: updated.status.as_str().to_string(),
            notify: booking_counterparts(repo, updated.patient_id, updated.clinic_id, local.id),
        },
    );
    Ok(updated)
}

/// Adds an appointment to an open booking unless it clashes with the clinic schedule.
pub fn schedule_appointment<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
    form: AppointmentForm,
) -> ServiceResult<Appointment>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + BookingWriter + ?Sized,
{
    if let Err(err) = form.validate() {
        log::error!("Failed to validate appointment form: {err}");
        return Err(ServiceError::Form("Please check the appointment details.".to_string()));
    }
    let booking = load_booking_record(repo, booking_id)?;
    ensure_clinic_access(repo, user, booking.clinic_id)?;
    if booking.status.is_final() {
        return Err(ServiceError::Conflict(format!(
            "Booking {} is {}.",
            booking.reference, booking.status
        )));
    }

    let appointment = form.to_new_appointment(booking.id, booking.clinic_id)?;
    let window_start = appointment.starts_at - Duration::minutes(MAX_APPOINTMENT_MINUTES);
    let clash = repo
        .list_clinic_appointments(booking.clinic_id, window_start, appointment.ends_at())?
        .into_iter()
        .find(|existing| appointment.overlaps(existing));
    if let Some(existing) = clash {
        return Err(ServiceError::Conflict(format!(
            "Overlaps \"{}\" at {}.",
            existing.title,
            existing.starts_at.format("%d %b %H:%M")
        )));
    }

    repo.create_appointment(&appointment).map_err(|err| {
        log::error!("Failed to schedule appointment for {}: {err}", booking.reference);
        err.into()
    })
}

pub fn cancel_appointment<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
    appointment_id: i32,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + BookingWriter + ?Sized,
{
    let appointment_id = AppointmentId::new(appointment_id)?;
    let booking = load_booking_record(repo, booking_id)?;
    ensure_clinic_access(repo, user, booking.clinic_id)?;
    if !repo
        .list_appointments(booking.id)?
        .iter()
        .any(|appointment| appointment.id == appointment_id)
    {
        return Err(ServiceError::NotFound);
    }
    repo.delete_appointment(appointment_id).map_err(|err| {
        log::error!("Failed to delete appointment {appointment_id}: {err}");
        err.into()
    })
}

/// Records a payment attempt. Only admins record refunds.
pub fn record_payment<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
    form: PaymentForm,
) -> ServiceResult<Payment>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + BookingWriter + ?Sized,
{
    let booking = load_booking_record(repo, booking_id)?;
    let (_, viewer) = booking_viewer(repo, user, &booking)?;
    let payment = form.to_new_payment(booking.id)?;

    match viewer {
        BookingViewer::Admin => {}
        BookingViewer::Patient if payment.kind != PaymentKind::Refund => {
            if booking.status == BookingStatus::Cancelled {
                return Err(ServiceError::Conflict(format!(
                    "Booking {} is cancelled.",
                    booking.reference
                )));
            }
        }
        _ => return Err(ServiceError::Unauthorized),
    }

    repo.create_payment(&payment).map_err(|err| {
        log::error!("Failed to record payment for {}: {err}", booking.reference);
        err.into()
    })
}

/// Settles a payment. A succeeded deposit confirms a pending booking.
pub fn update_payment_status<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    payment_id: i32,
    form: PaymentStatusForm,
) -> ServiceResult<Payment>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + BookingWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let next = form.status()?;
    let actor = current_user(repo, user)?;
    let payment = repo
        .get_payment_by_id(PaymentId::new(payment_id)?)?
        .ok_or(ServiceError::NotFound)?;
    if !payment.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "A {} payment cannot become {}.",
            payment.status, next
        )));
    }
    let updated = repo.update_payment_status(payment.id, next)?;

    if updated.kind == PaymentKind::Deposit && updated.status == PaymentStatus::Succeeded {
        let booking = repo
            .get_booking_by_id(updated.booking_id)?
            .ok_or(ServiceError::NotFound)?;
        if booking.status == BookingStatus::Pending {
            let confirmed = repo.update_booking_status(booking.id, BookingStatus::Confirmed)?;
            log::info!("Deposit received, booking {} confirmed", confirmed.reference);
            publish_quietly(
                publisher,
                DentalEvent::BookingStatusChanged {
                    booking_id: confirmed.id.get(),
                    reference: confirmed.reference.clone(),
                    status: confirmed.status.as_str().to_string(),
                    notify: booking_counterparts(
                        repo,
                        confirmed.patient_id,
                        confirmed.clinic_id,
                        actor.id,
                    ),
                },
            );
        }
    }
    Ok(updated)
}

pub fn list_payments<R>(
    repo: &R,
    user: &AuthenticatedUser,
    status: Option<String>,
) -> ServiceResult<Vec<Payment>>
where
    R: BookingReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let status = match status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(PaymentStatus::try_from(raw)?),
        None => None,
    };
    Ok(repo.list_payments_by_status(status)?)
}

/// Active partner hotels, optionally in one city.
pub fn list_hotels<R>(repo: &R, city: Option<String>) -> ServiceResult<Vec<Hotel>>
where
    R: HotelReader + ?Sized,
{
    let city = match city.filter(|c| !c.trim().is_empty()) {
        Some(raw) => Some(CityName::new(raw)?),
        None => None,
    };
    Ok(repo.list_hotels(city, true)?)
}

/// Patient asks for a hotel stay alongside their booking.
pub fn request_hotel_stay<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
    form: HotelStayForm,
) -> ServiceResult<HotelBooking>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + HotelReader + HotelWriter + ?Sized,
{
    if let Err(err) = form.validate() {
        log::error!("Failed to validate hotel stay form: {err}");
        return Err(ServiceError::Form("Please check the stay details.".to_string()));
    }
    let booking = load_booking_record(repo, booking_id)?;
    let (_, viewer) = booking_viewer(repo, user, &booking)?;
    if viewer == BookingViewer::Clinic {
        return Err(ServiceError::Unauthorized);
    }
    if booking.status.is_final() {
        return Err(ServiceError::Conflict(format!(
            "Booking {} is {}.",
            booking.reference, booking.status
        )));
    }
    let hotel = repo
        .get_hotel_by_id(HotelId::new(form.hotel_id)?)?
        .filter(|hotel| hotel.active)
        .ok_or(ServiceError::NotFound)?;
    let stay = NewHotelBooking::try_new(booking.id, &hotel, form.check_in, form.check_out, form.guests)?;
    repo.create_hotel_booking(&stay).map_err(|err| {
        log::error!("Failed to request hotel stay for {}: {err}", booking.reference);
        err.into()
    })
}

pub fn update_hotel_stay<R>(
    repo: &R,
    user: &AuthenticatedUser,
    stay_id: i32,
    form: HotelStayStatusForm,
) -> ServiceResult<HotelBooking>
where
    R: HotelReader + HotelWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let next = form.status()?;
    let stay = repo
        .get_hotel_booking_by_id(HotelBookingId::new(stay_id)?)?
        .ok_or(ServiceError::NotFound)?;
    if !stay.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "A {} stay cannot become {}.",
            stay.status.as_str(),
            next.as_str()
        )));
    }
    Ok(repo.update_hotel_booking_status(stay.id, next)?)
}

pub fn list_hotel_stays<R>(
    repo: &R,
    user: &AuthenticatedUser,
    status: Option<String>,
) -> ServiceResult<Vec<HotelBooking>>
where
    R: HotelReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let status = match status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(HotelBookingStatus::try_from(raw)?),
        None => None,
    };
    Ok(repo.list_hotel_bookings_by_status(status)?)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::auth::Portal;
    use crate::domain::booking::NewAppointment;
    use crate::domain::types::{ClinicId, Money, PlanId, Title, UserId};
    use crate::repository::mock::MockRepository;
    use crate::services::events::recording::RecordingPublisher;
    use crate::services::test_support::{
        admin_claims, clinic, clinic_claims, now, patient_claims, user,
    };

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(5).unwrap(),
            reference: "K7QM2ZPA".to_string(),
            patient_id: UserId::new(9).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            plan_id: PlanId::new(4).unwrap(),
            status,
            total: Money::from_pounds(2400),
            deposit: Money::from_pounds(480),
            arrival_date: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn repo_for(user_id: i32, portal: Portal, status: BookingStatus) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(move |email| Ok(Some(user(user_id, email.as_str(), portal))));
        repo.expect_get_booking_by_id()
            .returning(move |_| Ok(Some(booking(status))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));
        repo.expect_list_clinic_staff()
            .returning(|_| Ok(vec![user(20, "staff@clinic.example", Portal::Clinic)]));
        repo
    }

    #[test]
    fn patients_only_see_cancel() {
        assert_eq!(
            next_statuses(BookingStatus::Pending, BookingViewer::Patient),
            vec![BookingStatus::Cancelled]
        );
        assert_eq!(
            next_statuses(BookingStatus::Pending, BookingViewer::Clinic),
            vec![BookingStatus::Confirmed, BookingStatus::Cancelled]
        );
        assert!(next_statuses(BookingStatus::Completed, BookingViewer::Admin).is_empty());
    }

    #[test]
    fn patient_cannot_confirm_booking() {
        let repo = repo_for(9, Portal::Patient, BookingStatus::Pending);
        let publisher = RecordingPublisher::default();
        let form = BookingStatusForm {
            status: "confirmed".into(),
        };
        let result = change_status(&repo, &publisher, &patient_claims(), 5, form);
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn clinic_confirmation_notifies_patient() {
        let mut repo = repo_for(20, Portal::Clinic, BookingStatus::Pending);
        repo.expect_update_booking_status()
            .times(1)
            .returning(|_, status| Ok(booking(status)));
        let publisher = RecordingPublisher::default();
        let form = BookingStatusForm {
            status: "confirmed".into(),
        };

        let updated = change_status(&repo, &publisher, &clinic_claims(), 5, form).unwrap();
        assert_eq!(updated.status, BookingStatus::Confirmed);
        let events = publisher.published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].recipients(), &[9]);
    }

    #[test]
    fn strangers_get_not_found() {
        let repo = repo_for(33, Portal::Patient, BookingStatus::Pending);
        let result = load_booking_record(&repo, 5)
            .and_then(|booking| booking_viewer(&repo, &patient_claims(), &booking));
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn overlapping_appointments_are_rejected() {
        let mut repo = repo_for(20, Portal::Clinic, BookingStatus::Confirmed);
        repo.expect_list_clinic_appointments().returning(|clinic_id, _, _| {
            let start = NaiveDate::from_ymd_opt(2026, 11, 4)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap();
            let existing = NewAppointment::try_new(
                BookingId::new(6).unwrap(),
                clinic_id,
                Title::new("Consultation").unwrap(),
                start,
                60,
                None,
            )
            .unwrap();
            Ok(vec![Appointment {
                id: AppointmentId::new(1).unwrap(),
                booking_id: existing.booking_id,
                clinic_id,
                title: existing.title,
                starts_at: existing.starts_at,
                duration_minutes: existing.duration_minutes,
                notes: None,
                created_at: now(),
            }])
        });
        repo.expect_create_appointment().never();

        let form = AppointmentForm {
            title: "Implant placement".into(),
            starts_at: "2026-11-04T10:00".into(),
            duration_minutes: 90,
            notes: None,
        };
        let result = schedule_appointment(&repo, &clinic_claims(), 5, form);
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn patients_cannot_record_refunds() {
        let repo = repo_for(9, Portal::Patient, BookingStatus::Confirmed);
        let form = PaymentForm {
            amount: "100".into(),
            kind: "refund".into(),
            reference: None,
        };
        let result = record_payment(&repo, &patient_claims(), 5, form);
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn succeeded_deposit_confirms_booking() {
        let mut repo = repo_for(1, Portal::Admin, BookingStatus::Pending);
        let payment = |status| Payment {
            id: PaymentId::new(3).unwrap(),
            booking_id: BookingId::new(5).unwrap(),
            amount: Money::from_pounds(480),
            kind: PaymentKind::Deposit,
            status,
            reference: None,
            created_at: now(),
            updated_at: now(),
        };
        repo.expect_get_payment_by_id()
            .returning(move |_| Ok(Some(payment(PaymentStatus::Pending))));
        repo.expect_update_payment_status()
            .returning(move |_, status| Ok(payment(status)));
        repo.expect_update_booking_status()
            .times(1)
            .withf(|_, status| *status == BookingStatus::Confirmed)
            .returning(|_, status| Ok(booking(status)));
        let publisher = RecordingPublisher::default();
        let form = PaymentStatusForm {
            status: "succeeded".into(),
        };

        update_payment_status(&repo, &publisher, &admin_claims(), 3, form).unwrap();
        assert_eq!(publisher.published().len(), 1);
    }
}
