//! Booking message threads and in-app notifications.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    domain::{
        message::{Message, NewMessage, NewNotification, Notification},
        types::{BookingId, NotificationId, UserId},
    },
    models::message::{
        Message as DbMessage, NewMessage as DbNewMessage, NewNotification as DbNewNotification,
        Notification as DbNotification,
    },
    repository::{
        DieselRepository, MessageReader, MessageWriter, NotificationReader, NotificationWriter,
        errors::RepositoryResult,
    },
};

impl MessageReader for DieselRepository {
    fn list_messages(&self, booking_id: BookingId) -> RepositoryResult<Vec<Message>> {
        use crate::schema::messages;

        let mut conn = self.conn()?;
        let messages = messages::table
            .filter(messages::booking_id.eq(booking_id.get()))
            .order((messages::created_at.asc(), messages::id.asc()))
            .load::<DbMessage>(&mut conn)?
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn count_unread_messages(&self, user_id: UserId) -> RepositoryResult<usize> {
        use crate::schema::{bookings, clinic_staff, messages};

        let mut conn = self.conn()?;
        let staffed_clinics = clinic_staff::table
            .filter(clinic_staff::user_id.eq(user_id.get()))
            .select(clinic_staff::clinic_id);
        let participating = bookings::table
            .filter(
                bookings::patient_id
                    .eq(user_id.get())
                    .or(bookings::clinic_id.eq_any(staffed_clinics)),
            )
            .select(bookings::id);

        let count = messages::table
            .filter(messages::booking_id.eq_any(participating))
            .filter(messages::sender_id.ne(user_id.get()))
            .filter(messages::read_at.is_null())
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(count as usize)
    }
}

impl MessageWriter for DieselRepository {
    fn create_message(&self, message: &NewMessage) -> RepositoryResult<Message> {
        use crate::schema::messages;

        let mut conn = self.conn()?;
        let db_new_message: DbNewMessage = message.into();
        let db_message = diesel::insert_into(messages::table)
            .values(&db_new_message)
            .get_result::<DbMessage>(&mut conn)?;

        Ok(Message::try_from(db_message)?)
    }

    fn mark_messages_read(
        &self,
        booking_id: BookingId,
        reader: UserId,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        use crate::schema::messages;

        let mut conn = self.conn()?;
        let affected = diesel::update(
            messages::table
                .filter(messages::booking_id.eq(booking_id.get()))
                .filter(messages::sender_id.ne(reader.get()))
                .filter(messages::read_at.is_null()),
        )
        .set(messages::read_at.eq(Some(at)))
        .execute(&mut conn)?;
        Ok(affected)
    }
}

impl NotificationReader for DieselRepository {
    fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
    ) -> RepositoryResult<Vec<Notification>> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let mut query = notifications::table
            .filter(notifications::user_id.eq(user_id.get()))
            .into_boxed();
        if unread_only {
            query = query.filter(notifications::read.eq(false));
        }
        let notifications = query
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .limit(limit)
            .load::<DbNotification>(&mut conn)?
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    fn count_unread_notifications(&self, user_id: UserId) -> RepositoryResult<usize> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let count = notifications::table
            .filter(notifications::user_id.eq(user_id.get()))
            .filter(notifications::read.eq(false))
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(count as usize)
    }
}

impl NotificationWriter for DieselRepository {
    fn create_notifications(&self, notifications: &[NewNotification]) -> RepositoryResult<usize> {
        use crate::schema::notifications as table;

        if notifications.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let rows: Vec<DbNewNotification> = notifications.iter().map(Into::into).collect();
        let affected = diesel::insert_into(table::table)
            .values(&rows)
            .execute(&mut conn)?;
        Ok(affected)
    }

    fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> RepositoryResult<bool> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let affected = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id.get()))
                .filter(notifications::user_id.eq(user_id.get())),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)?;
        Ok(affected > 0)
    }

    fn mark_all_notifications_read(&self, user_id: UserId) -> RepositoryResult<usize> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let affected = diesel::update(
            notifications::table
                .filter(notifications::user_id.eq(user_id.get()))
                .filter(notifications::read.eq(false)),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)?;
        Ok(affected)
    }
}
