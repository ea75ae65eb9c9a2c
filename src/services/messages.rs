//! Booking message threads.

use chrono::Utc;
use validator::Validate;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::booking::Booking;
use crate::domain::message::{Message, NewMessage};
use crate::domain::types::{SafeText, TypeConstraintError};
use crate::dto::bookings::BookingViewer;
use crate::forms::messages::MessageForm;
use crate::models::zmq::DentalEvent;
use crate::repository::{
    BookingReader, ClinicReader, MessageReader, MessageWriter, UserReader, UserWriter,
};
use crate::services::bookings::{booking_viewer, load_booking_record};
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::booking_counterparts;
use crate::services::{ServiceError, ServiceResult};

/// Thread of a booking, oldest first. Messages from others become read.
pub fn load_thread<R>(
    repo: &R,
    user: &AuthenticatedUser,
    booking_id: i32,
) -> ServiceResult<(Booking, BookingViewer, Vec<Message>)>
where
    R: UserReader
        + UserWriter
        + ClinicReader
        + BookingReader
        + MessageReader
        + MessageWriter
        + ?Sized,
{
    let booking = load_booking_record(repo, booking_id)?;
    let (local, viewer) = booking_viewer(repo, user, &booking)?;
    let marked = repo.mark_messages_read(booking.id, local.id, Utc::now().naive_utc())?;
    if marked > 0 {
        log::debug!("Marked {marked} message(s) read on {}", booking.reference);
    }
    let messages = repo.list_messages(booking.id)?;
    Ok((booking, viewer, messages))
}

/// Posts a sanitised message and notifies the other participants.
pub fn post_message<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    booking_id: i32,
    form: MessageForm,
) -> ServiceResult<Message>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + MessageWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    if let Err(err) = form.validate() {
        log::warn!("Rejected message: {err}");
        return Err(ServiceError::Form("Messages must be 1 to 4000 characters.".to_string()));
    }
    let booking = load_booking_record(repo, booking_id)?;
    let (local, _) = booking_viewer(repo, user, &booking)?;
    let body = SafeText::new(form.body).map_err(|err| match err {
        TypeConstraintError::TooLong(max) => {
            ServiceError::Form(format!("Messages must be at most {max} characters."))
        }
        _ => ServiceError::Form("The message is empty after cleaning.".to_string()),
    })?;

    let message = repo
        .create_message(&NewMessage {
            booking_id: booking.id,
            sender_id: local.id,
            body,
        })
        .map_err(|err| {
            log::error!("Failed to post message on {}: {err}", booking.reference);
            ServiceError::from(err)
        })?;

    publish_quietly(
        publisher,
        DentalEvent::MessagePosted {
            booking_id: booking.id.get(),
            reference: booking.reference.clone(),
            notify: booking_counterparts(repo, booking.patient_id, booking.clinic_id, local.id),
        },
    );
    Ok(message)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::auth::Portal;
    use crate::domain::booking::BookingStatus;
    use crate::domain::types::{BookingId, ClinicId, MessageId, Money, PlanId, UserId};
    use crate::repository::mock::MockRepository;
    use crate::services::events::recording::RecordingPublisher;
    use crate::services::test_support::{clinic, now, patient_claims, user};

    fn booking() -> Booking {
        Booking {
            id: BookingId::new(5).unwrap(),
            reference: "K7QM2ZPA".to_string(),
            patient_id: UserId::new(9).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            plan_id: PlanId::new(4).unwrap(),
            status: BookingStatus::Confirmed,
            total: Money::from_pounds(2400),
            deposit: Money::from_pounds(480),
            arrival_date: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn patient_repo(patient_id: i32) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(move |email| Ok(Some(user(patient_id, email.as_str(), Portal::Patient))));
        repo.expect_get_booking_by_id()
            .returning(|_| Ok(Some(booking())));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));
        repo.expect_list_clinic_staff()
            .returning(|_| Ok(vec![user(20, "staff@clinic.example", Portal::Clinic)]));
        repo
    }

    #[test]
    fn posting_notifies_clinic_staff() {
        let mut repo = patient_repo(9);
        repo.expect_create_message()
            .times(1)
            .withf(|message| message.body.as_str() == "When is my flight pickup?")
            .returning(|new| {
                Ok(Message {
                    id: MessageId::new(1).unwrap(),
                    booking_id: new.booking_id,
                    sender_id: new.sender_id,
                    body: new.body.clone(),
                    read_at: None,
                    created_at: now(),
                })
            });
        let publisher = RecordingPublisher::default();
        let form = MessageForm {
            body: "When is my flight pickup?".into(),
        };

        post_message(&repo, &publisher, &patient_claims(), 5, form).unwrap();
        assert_eq!(publisher.published()[0].recipients(), &[20]);
    }

    #[test]
    fn outsiders_cannot_post() {
        let mut repo = patient_repo(33);
        repo.expect_create_message().never();
        let publisher = RecordingPublisher::default();
        let form = MessageForm {
            body: "hello".into(),
        };
        assert!(matches!(
            post_message(&repo, &publisher, &patient_claims(), 5, form),
            Err(ServiceError::NotFound)
        ));
    }

    #[test]
    fn empty_messages_are_rejected() {
        let repo = MockRepository::new();
        let publisher = RecordingPublisher::default();
        let form = MessageForm { body: String::new() };
        assert!(matches!(
            post_message(&repo, &publisher, &patient_claims(), 5, form),
            Err(ServiceError::Form(_))
        ));
    }
}
