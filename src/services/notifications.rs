//! In-app notifications derived from published events.

use crate::domain::auth::AuthenticatedUser;
use crate::domain::message::{NewNotification, Notification};
use crate::domain::types::{NotificationId, Title, UserId};
use crate::dto::UnreadCounts;
use crate::models::zmq::DentalEvent;
use crate::repository::{
    MessageReader, NotificationReader, NotificationWriter, UserReader, UserWriter,
};
use crate::repository::errors::RepositoryResult;
use crate::services::users::current_user;
use crate::services::{ServiceError, ServiceResult};

const LIST_LIMIT: i64 = 50;

fn humanize(status: &str) -> String {
    status.replace('_', " ")
}

/// One notification per recipient of `event`.
///
/// Links point at the portal-neutral redirects so every recipient lands on
/// the page of their own portal.
pub fn notifications_for_event(event: &DentalEvent) -> Vec<NewNotification> {
    let (title, body, link) = match event {
        DentalEvent::OffersChanged { status, .. } => (
            "Special offer reviewed",
            format!("Your special offer is now {}.", humanize(status)),
            Some("/clinic/offers".to_string()),
        ),
        DentalEvent::BookingStatusChanged {
            booking_id,
            reference,
            status,
            ..
        } => (
            "Booking updated",
            format!("Booking {reference} is now {}.", humanize(status)),
            Some(format!("/booking/{booking_id}")),
        ),
        DentalEvent::QuoteUpdated {
            quote_id, status, ..
        } => (
            "Quote updated",
            format!("Quote #{quote_id} is now {}.", humanize(status)),
            Some(format!("/quote-request/{quote_id}")),
        ),
        DentalEvent::MessagePosted {
            booking_id,
            reference,
            ..
        } => (
            "New message",
            format!("You have a new message about booking {reference}."),
            Some(format!("/booking/{booking_id}")),
        ),
    };
    let Ok(title) = Title::new(title) else {
        return Vec::new();
    };

    event
        .recipients()
        .iter()
        .filter_map(|id| UserId::new(*id).ok())
        .map(|user_id| NewNotification::new(user_id, title.clone(), body.clone(), link.clone()))
        .collect()
}

/// Persists the notifications of `event`, returning how many were stored.
pub fn store_event_notifications<R>(repo: &R, event: &DentalEvent) -> RepositoryResult<usize>
where
    R: NotificationWriter + ?Sized,
{
    let notifications = notifications_for_event(event);
    if notifications.is_empty() {
        return Ok(0);
    }
    repo.create_notifications(&notifications)
}

pub fn list_notifications<R>(
    repo: &R,
    user: &AuthenticatedUser,
    unread_only: bool,
) -> ServiceResult<Vec<Notification>>
where
    R: UserReader + UserWriter + NotificationReader + ?Sized,
{
    let local = current_user(repo, user)?;
    Ok(repo.list_notifications(local.id, unread_only, LIST_LIMIT)?)
}

pub fn mark_read<R>(repo: &R, user: &AuthenticatedUser, notification_id: i32) -> ServiceResult<()>
where
    R: UserReader + UserWriter + NotificationWriter + ?Sized,
{
    let local = current_user(repo, user)?;
    if repo.mark_notification_read(NotificationId::new(notification_id)?, local.id)? {
        Ok(())
    } else {
        Err(ServiceError::NotFound)
    }
}

pub fn mark_all_read<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<usize>
where
    R: UserReader + UserWriter + NotificationWriter + ?Sized,
{
    let local = current_user(repo, user)?;
    Ok(repo.mark_all_notifications_read(local.id)?)
}

pub fn unread_counts<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<UnreadCounts>
where
    R: UserReader + UserWriter + NotificationReader + MessageReader + ?Sized,
{
    let local = current_user(repo, user)?;
    Ok(UnreadCounts {
        messages: repo.count_unread_messages(local.id)?,
        notifications: repo.count_unread_notifications(local.id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_event_fans_out_to_recipients() {
        let event = DentalEvent::BookingStatusChanged {
            booking_id: 5,
            reference: "K7QM2ZPA".into(),
            status: "in_progress".into(),
            notify: vec![9, 20],
        };
        let notifications = notifications_for_event(&event);
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].user_id.get(), 9);
        assert_eq!(notifications[1].body, "Booking K7QM2ZPA is now in progress.");
        assert_eq!(notifications[1].link.as_deref(), Some("/booking/5"));
    }

    #[test]
    fn carousel_refresh_without_recipients_stores_nothing() {
        let event = DentalEvent::OffersChanged {
            offer_id: 1,
            status: "deleted".into(),
            notify: vec![],
        };
        assert!(notifications_for_event(&event).is_empty());
    }

    #[test]
    fn invalid_recipient_ids_are_skipped() {
        let event = DentalEvent::QuoteUpdated {
            quote_id: 3,
            status: "quoted".into(),
            notify: vec![0, 4],
        };
        let notifications = notifications_for_event(&event);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].link.as_deref(), Some("/quote-request/3"));
    }
}
