//! Business operations behind the portals and the JSON API.
//!
//! Services are generic over the repository traits they need so they can be
//! exercised against `MockRepository` in tests.

use thiserror::Error;

use crate::domain::auth::{AuthenticatedUser, check_role};
use crate::domain::quote_wizard::WizardError;
use crate::forms::FormError;
use crate::repository::errors::RepositoryError;

pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod dental_chart;
pub mod documents;
pub mod events;
pub mod messages;
pub mod notifications;
pub mod offers;
pub mod plans;
pub mod quote_document;
pub mod quotes;
pub mod users;
pub mod wizard;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Form(String),

    #[error("{0}")]
    TypeConstraint(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::ValidationError(msg) => ServiceError::TypeConstraint(msg),
            other => ServiceError::Repository(other),
        }
    }
}

impl From<FormError> for ServiceError {
    fn from(err: FormError) -> Self {
        ServiceError::Form(err.to_string())
    }
}

impl From<WizardError> for ServiceError {
    fn from(err: WizardError) -> Self {
        ServiceError::Form(err.to_string())
    }
}

/// Fails with [`ServiceError::Unauthorized`] unless the user holds `role`.
pub fn ensure_role(user: &AuthenticatedUser, role: &str) -> ServiceResult<()> {
    if check_role(role, &user.roles) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by service tests.

    use chrono::{NaiveDateTime, Utc};

    use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser, CLINIC_ROLE, PATIENT_ROLE, Portal};
    use crate::domain::clinic::Clinic;
    use crate::domain::types::{CityName, ClinicId, ClinicName, Email, PersonName, UserId};
    use crate::domain::user::User;

    pub fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    pub fn claims(email: &str, role: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: email.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            roles: vec![role.to_string()],
            exp: 0,
        }
    }

    pub fn patient_claims() -> AuthenticatedUser {
        claims("patient@example.com", PATIENT_ROLE)
    }

    pub fn clinic_claims() -> AuthenticatedUser {
        claims("staff@clinic.example", CLINIC_ROLE)
    }

    pub fn admin_claims() -> AuthenticatedUser {
        claims("admin@example.com", ADMIN_ROLE)
    }

    pub fn user(id: i32, email: &str, portal: Portal) -> User {
        User {
            id: UserId::new(id).unwrap(),
            email: Email::new(email).unwrap(),
            name: PersonName::new("Test User").unwrap(),
            portal,
            phone: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    pub fn clinic(id: i32, name: &str, rating: i32, price_factor: i32) -> Clinic {
        Clinic {
            id: ClinicId::new(id).unwrap(),
            name: ClinicName::new(name).unwrap(),
            slug: crate::domain::clinic::slugify(name),
            city: CityName::new("Istanbul").unwrap(),
            address: None,
            description: None,
            rating,
            price_factor,
            verified: true,
            created_at: now(),
            updated_at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::{CLINIC_ROLE, PATIENT_ROLE};

    #[test]
    fn patient_cannot_pass_clinic_gate() {
        let patient = test_support::patient_claims();
        assert!(ensure_role(&patient, PATIENT_ROLE).is_ok());
        assert!(matches!(
            ensure_role(&patient, CLINIC_ROLE),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn admin_passes_every_gate() {
        let admin = test_support::admin_claims();
        assert!(ensure_role(&admin, CLINIC_ROLE).is_ok());
        assert!(ensure_role(&admin, PATIENT_ROLE).is_ok());
    }

    #[test]
    fn missing_row_becomes_not_found() {
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound
        ));
    }
}
