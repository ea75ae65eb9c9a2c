//! Users mirrored from the identity service.

use chrono::Utc;
use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        auth::Portal,
        types::{Email, UserId},
        user::{NewUser, User},
    },
    models::user::{NewUser as DbNewUser, User as DbUser},
    repository::{DieselRepository, UserReader, UserWriter, errors::RepositoryResult},
};

impl UserReader for DieselRepository {
    fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .find(id.get())
            .first::<DbUser>(&mut conn)
            .optional()?;

        Ok(db_user.map(User::try_from).transpose()?)
    }

    fn get_user_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .filter(users::email.eq(email.as_str()))
            .first::<DbUser>(&mut conn)
            .optional()?;

        Ok(db_user.map(User::try_from).transpose()?)
    }

    fn list_users(&self, portal: Option<Portal>) -> RepositoryResult<Vec<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let mut query = users::table.into_boxed();
        if let Some(portal) = portal {
            query = query.filter(users::portal.eq(portal.as_str()));
        }

        let users = query
            .order(users::name.asc())
            .load::<DbUser>(&mut conn)?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

impl UserWriter for DieselRepository {
    fn upsert_user(&self, new_user: &NewUser) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_new_user: DbNewUser = new_user.into();

        let db_user = diesel::insert_into(users::table)
            .values(&db_new_user)
            .on_conflict(users::email)
            .do_update()
            .set((
                users::name.eq(excluded(users::name)),
                users::portal.eq(excluded(users::portal)),
                users::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<DbUser>(&mut conn)?;

        Ok(User::try_from(db_user)?)
    }
}
