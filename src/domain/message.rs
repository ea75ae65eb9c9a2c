//! Booking message threads and in-app notifications.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{BookingId, MessageId, NotificationId, SafeText, Title, UserId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub booking_id: BookingId,
    pub sender_id: UserId,
    pub body: SafeText,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Message {
    pub fn is_unread_for(&self, viewer: UserId) -> bool {
        self.read_at.is_none() && self.sender_id != viewer
    }
}

#[derive(Clone, Debug)]
pub struct NewMessage {
    pub booking_id: BookingId,
    pub sender_id: UserId,
    pub body: SafeText,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: Title,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: Title,
    pub body: String,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(user_id: UserId, title: Title, body: impl Into<String>, link: Option<String>) -> Self {
        Self {
            user_id,
            title,
            body: body.into(),
            link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn own_messages_are_never_unread() {
        let sender = UserId::new(1).unwrap();
        let message = Message {
            id: MessageId::new(1).unwrap(),
            booking_id: BookingId::new(1).unwrap(),
            sender_id: sender,
            body: SafeText::new("See you on Monday").unwrap(),
            read_at: None,
            created_at: Utc::now().naive_utc(),
        };
        assert!(!message.is_unread_for(sender));
        assert!(message.is_unread_for(UserId::new(2).unwrap()));
    }
}
