//! Identity claims issued by the auth service and portal role checks.

use serde::{Deserialize, Serialize};

use crate::domain::types::{Email, PersonName, TypeConstraintError};

pub const PATIENT_ROLE: &str = "dental_patient";
pub const CLINIC_ROLE: &str = "dental_clinic";
pub const ADMIN_ROLE: &str = "dental_admin";

/// Claims carried by the JWT stored in the identity cookie.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub exp: usize,
}

/// Portal a user lands in, ordered by privilege.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Portal {
    Patient,
    Clinic,
    Admin,
}

impl Portal {
    pub fn as_str(self) -> &'static str {
        match self {
            Portal::Patient => "patient",
            Portal::Clinic => "clinic",
            Portal::Admin => "admin",
        }
    }

    pub fn role(self) -> &'static str {
        match self {
            Portal::Patient => PATIENT_ROLE,
            Portal::Clinic => CLINIC_ROLE,
            Portal::Admin => ADMIN_ROLE,
        }
    }
}

impl TryFrom<&str> for Portal {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "patient" => Ok(Portal::Patient),
            "clinic" => Ok(Portal::Clinic),
            "admin" => Ok(Portal::Admin),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown portal: {other}"
            ))),
        }
    }
}

/// Returns `true` when `role` is present in `roles`.
///
/// Admins implicitly hold every portal role.
pub fn check_role(role: &str, roles: &[String]) -> bool {
    roles.iter().any(|r| r == role || r == ADMIN_ROLE)
}

impl AuthenticatedUser {
    /// Highest portal the user is entitled to, if any.
    pub fn portal(&self) -> Option<Portal> {
        [Portal::Admin, Portal::Clinic, Portal::Patient]
            .into_iter()
            .find(|portal| self.roles.iter().any(|r| r == portal.role()))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }

    /// Validated email from the claims.
    pub fn email(&self) -> Result<Email, TypeConstraintError> {
        Email::new(self.email.as_str())
    }

    /// Validated display name, falling back to the email when the claim is blank.
    pub fn display_name(&self) -> Result<PersonName, TypeConstraintError> {
        PersonName::new(self.name.as_str()).or_else(|_| PersonName::new(self.email.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "1".into(),
            email: "someone@example.com".into(),
            name: "".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
        }
    }

    #[test]
    fn admin_passes_every_role_check() {
        let admin = user(&[ADMIN_ROLE]);
        assert!(check_role(PATIENT_ROLE, &admin.roles));
        assert!(check_role(CLINIC_ROLE, &admin.roles));
        assert_eq!(admin.portal(), Some(Portal::Admin));
    }

    #[test]
    fn portal_prefers_highest_role() {
        assert_eq!(
            user(&[PATIENT_ROLE, CLINIC_ROLE]).portal(),
            Some(Portal::Clinic)
        );
        assert_eq!(user(&["other_app"]).portal(), None);
        assert!(!check_role(CLINIC_ROLE, &user(&[PATIENT_ROLE]).roles));
    }

    #[test]
    fn blank_name_falls_back_to_email() {
        let name = user(&[PATIENT_ROLE]).display_name().unwrap();
        assert_eq!(name.as_str(), "someone@example.com");
    }
}
