use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::auth::Portal;
use crate::domain::types::{Email, PersonName, PhoneNumber, TypeConstraintError, UserId};
use crate::domain::user::{NewUser as DomainNewUser, User as DomainUser};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
/// Diesel model for [`crate::domain::user::User`].
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub portal: String,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub portal: &'a str,
}

impl TryFrom<User> for DomainUser {
    type Error = TypeConstraintError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(user.id)?,
            email: Email::new(user.email)?,
            name: PersonName::new(user.name)?,
            portal: Portal::try_from(user.portal.as_str())?,
            phone: user.phone.map(PhoneNumber::new).transpose()?,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewUser> for NewUser<'a> {
    fn from(user: &'a DomainNewUser) -> Self {
        Self {
            email: user.email.as_str(),
            name: user.name.as_str(),
            portal: user.portal.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn db_user_converts_to_domain() {
        let now = Utc::now().naive_utc();
        let user = DomainUser::try_from(User {
            id: 3,
            email: "patient@example.com".into(),
            name: "Pat".into(),
            portal: "patient".into(),
            phone: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
        assert_eq!(user.portal, Portal::Patient);
        assert_eq!(user.id.get(), 3);
    }

    #[test]
    fn unknown_portal_is_rejected() {
        let now = Utc::now().naive_utc();
        let result = DomainUser::try_from(User {
            id: 3,
            email: "patient@example.com".into(),
            name: "Pat".into(),
            portal: "other_app".into(),
            phone: None,
            created_at: now,
            updated_at: now,
        });
        assert!(result.is_err());
    }
}
