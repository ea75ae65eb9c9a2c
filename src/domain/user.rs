//! Local mirror of identities that have used the marketplace.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::auth::{AuthenticatedUser, Portal};
use crate::domain::types::{Email, PersonName, PhoneNumber, TypeConstraintError, UserId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: PersonName,
    pub portal: Portal,
    pub phone: Option<PhoneNumber>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Upsert payload keyed by email.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub email: Email,
    pub name: PersonName,
    pub portal: Portal,
}

impl NewUser {
    #[must_use]
    pub fn new(email: Email, name: PersonName, portal: Portal) -> Self {
        Self {
            email,
            name,
            portal,
        }
    }
}

impl TryFrom<&AuthenticatedUser> for NewUser {
    type Error = TypeConstraintError;

    fn try_from(user: &AuthenticatedUser) -> Result<Self, Self::Error> {
        let portal = user.portal().ok_or_else(|| {
            TypeConstraintError::InvalidValue("user has no marketplace role".to_string())
        })?;
        Ok(Self::new(user.email()?, user.display_name()?, portal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::{CLINIC_ROLE, PATIENT_ROLE};

    #[test]
    fn new_user_from_claims_uses_highest_portal() {
        let claims = AuthenticatedUser {
            sub: "7".into(),
            email: "Dr.Ayse@Clinic.example".into(),
            name: "Dr Ayse".into(),
            roles: vec![PATIENT_ROLE.into(), CLINIC_ROLE.into()],
            exp: 0,
        };
        let new_user = NewUser::try_from(&claims).unwrap();
        assert_eq!(new_user.portal, Portal::Clinic);
        assert_eq!(new_user.email.as_str(), "dr.ayse@clinic.example");
    }

    #[test]
    fn claims_without_roles_are_rejected() {
        let claims = AuthenticatedUser {
            sub: "7".into(),
            email: "x@example.com".into(),
            name: "X".into(),
            roles: vec![],
            exp: 0,
        };
        assert!(NewUser::try_from(&claims).is_err());
    }
}
