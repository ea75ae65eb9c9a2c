use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::message::{
    Message as DomainMessage, NewMessage as DomainNewMessage, NewNotification as DomainNewNotification,
    Notification as DomainNotification,
};
use crate::domain::types::{
    BookingId, MessageId, NotificationId, SafeText, Title, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::messages)]
pub struct Message {
    pub id: i32,
    pub booking_id: i32,
    pub sender_id: i32,
    pub body: String,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessage<'a> {
    pub booking_id: i32,
    pub sender_id: i32,
    pub body: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub body: &'a str,
    pub link: Option<&'a str>,
}

impl TryFrom<Message> for DomainMessage {
    type Error = TypeConstraintError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId::new(message.id)?,
            booking_id: BookingId::new(message.booking_id)?,
            sender_id: UserId::new(message.sender_id)?,
            body: SafeText::new(message.body)?,
            read_at: message.read_at,
            created_at: message.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewMessage> for NewMessage<'a> {
    fn from(message: &'a DomainNewMessage) -> Self {
        Self {
            booking_id: message.booking_id.get(),
            sender_id: message.sender_id.get(),
            body: message.body.as_str(),
        }
    }
}

impl TryFrom<Notification> for DomainNotification {
    type Error = TypeConstraintError;

    fn try_from(notification: Notification) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId::new(notification.id)?,
            user_id: UserId::new(notification.user_id)?,
            title: Title::new(notification.title)?,
            body: notification.body,
            link: notification.link,
            read: notification.read,
            created_at: notification.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewNotification> for NewNotification<'a> {
    fn from(notification: &'a DomainNewNotification) -> Self {
        Self {
            user_id: notification.user_id.get(),
            title: notification.title.as_str(),
            body: notification.body.as_str(),
            link: notification.link.as_deref(),
        }
    }
}
