//! Local user records and clinic staff access checks.

use crate::domain::auth::{AuthenticatedUser, CLINIC_ROLE, Portal};
use crate::domain::clinic::Clinic;
use crate::domain::types::{ClinicId, UserId};
use crate::domain::user::{NewUser, User};
use crate::repository::{ClinicListQuery, ClinicReader, UserReader, UserWriter};
use crate::services::{ServiceError, ServiceResult, ensure_role};

/// Upserts the local mirror of the signed-in identity.
pub fn sync_user<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<User>
where
    R: UserWriter + ?Sized,
{
    let new_user = NewUser::try_from(user).map_err(|err| {
        log::warn!("Rejecting identity {}: {err}", user.email);
        ServiceError::Unauthorized
    })?;
    repo.upsert_user(&new_user).map_err(|err| {
        log::error!("Failed to sync user {}: {err}", user.email);
        err.into()
    })
}

/// Local record of the signed-in user, created on first use.
pub fn current_user<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<User>
where
    R: UserReader + UserWriter + ?Sized,
{
    let email = user.email()?;
    match repo.get_user_by_email(&email)? {
        Some(existing) => Ok(existing),
        None => sync_user(repo, user),
    }
}

/// Clinics the signed-in staff member works for, sorted by name.
pub fn staff_clinics<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<(User, Vec<Clinic>)>
where
    R: UserReader + UserWriter + ClinicReader + ?Sized,
{
    ensure_role(user, CLINIC_ROLE)?;
    let local = current_user(repo, user)?;
    let mut clinics = repo.list_clinics_for_staff(local.id)?;
    clinics.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
    Ok((local, clinics))
}

/// Fails unless the user is an admin or works for `clinic_id`.
pub fn ensure_clinic_access<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: ClinicId,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + ?Sized,
{
    if user.is_admin() {
        return Ok(());
    }
    let (_, clinics) = staff_clinics(repo, user)?;
    if clinics.iter().any(|clinic| clinic.id == clinic_id) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

/// Clinic the clinic portal is showing.
///
/// Staff get `requested` when they work there, else their first clinic.
/// Admins may open any clinic. Staff without a clinic are unauthorized.
pub fn resolve_staff_clinic<R>(
    repo: &R,
    user: &AuthenticatedUser,
    requested: Option<i32>,
) -> ServiceResult<(Clinic, Vec<Clinic>)>
where
    R: UserReader + UserWriter + ClinicReader + ?Sized,
{
    let requested = requested.filter(|id| *id > 0).map(ClinicId::new).transpose()?;
    let (_, mut clinics) = staff_clinics(repo, user)?;

    if user.is_admin() && clinics.is_empty() {
        let (_, all) = repo.list_clinics(ClinicListQuery::default())?;
        clinics = all;
    }
    if let Some(id) = requested.filter(|_| user.is_admin()) {
        if !clinics.iter().any(|clinic| clinic.id == id) {
            let clinic = repo.get_clinic_by_id(id)?.ok_or(ServiceError::NotFound)?;
            return Ok((clinic, clinics));
        }
    }

    let selected = match requested {
        Some(id) => clinics.iter().find(|clinic| clinic.id == id),
        None => clinics.first(),
    };
    match selected {
        Some(clinic) => Ok((clinic.clone(), clinics)),
        None => {
            log::warn!("{} has no clinic assignment", user.email);
            Err(ServiceError::Unauthorized)
        }
    }
}

/// User ids of everyone working for the clinic.
///
/// Recipient lookups run after the write they announce has committed, so a
/// failure is logged and yields no recipients instead of failing the request.
pub fn clinic_staff_ids<R>(repo: &R, clinic_id: ClinicId) -> Vec<i32>
where
    R: ClinicReader + ?Sized,
{
    match repo.list_clinic_staff(clinic_id) {
        Ok(staff) => staff.into_iter().map(|user| user.id.get()).collect(),
        Err(err) => {
            log::error!("Failed to load staff of clinic {clinic_id} for notifications: {err}");
            Vec::new()
        }
    }
}

pub fn admin_ids<R>(repo: &R) -> Vec<i32>
where
    R: UserReader + ?Sized,
{
    match repo.list_users(Some(Portal::Admin)) {
        Ok(admins) => admins.into_iter().map(|user| user.id.get()).collect(),
        Err(err) => {
            log::error!("Failed to load admins for notifications: {err}");
            Vec::new()
        }
    }
}

/// Everyone notified about activity on a booking except `actor`.
pub fn booking_counterparts<R>(
    repo: &R,
    patient_id: UserId,
    clinic_id: ClinicId,
    actor: UserId,
) -> Vec<i32>
where
    R: ClinicReader + ?Sized,
{
    let mut ids = clinic_staff_ids(repo, clinic_id);
    ids.push(patient_id.get());
    ids.sort_unstable();
    ids.dedup();
    ids.retain(|id| *id != actor.get());
    ids
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use crate::services::test_support::{clinic, clinic_claims, patient_claims, user};

    #[test]
    fn sync_user_upserts_highest_portal() {
        let mut repo = MockRepository::new();
        repo.expect_upsert_user()
            .times(1)
            .withf(|new_user| new_user.portal == Portal::Clinic)
            .returning(|new_user| Ok(user(3, new_user.email.as_str(), new_user.portal)));

        let synced = sync_user(&repo, &clinic_claims()).unwrap();
        assert_eq!(synced.id.get(), 3);
    }

    #[test]
    fn staff_without_clinic_is_unauthorized() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(3, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![]));

        let result = resolve_staff_clinic(&repo, &clinic_claims(), None);
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn staff_cannot_open_foreign_clinic() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(3, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));

        let (selected, _) = resolve_staff_clinic(&repo, &clinic_claims(), None).unwrap();
        assert_eq!(selected.id.get(), 1);
        assert!(matches!(
            ensure_clinic_access(&repo, &clinic_claims(), ClinicId::new(2).unwrap()),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn patients_are_not_staff() {
        let repo = MockRepository::new();
        assert!(matches!(
            staff_clinics(&repo, &patient_claims()),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn counterparts_exclude_the_actor() {
        let mut repo = MockRepository::new();
        repo.expect_list_clinic_staff()
            .returning(|_| Ok(vec![user(7, "a@clinic.example", Portal::Clinic)]));
        let ids = booking_counterparts(
            &repo,
            UserId::new(2).unwrap(),
            ClinicId::new(1).unwrap(),
            UserId::new(7).unwrap(),
        );
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn recipient_lookup_failures_yield_no_recipients() {
        let mut repo = MockRepository::new();
        repo.expect_list_clinic_staff()
            .returning(|_| Err(RepositoryError::ConnectionError("pool timed out".into())));
        repo.expect_list_users()
            .returning(|_| Err(RepositoryError::ConnectionError("pool timed out".into())));

        assert!(admin_ids(&repo).is_empty());
        let ids = booking_counterparts(
            &repo,
            UserId::new(2).unwrap(),
            ClinicId::new(1).unwrap(),
            UserId::new(7).unwrap(),
        );
        assert_eq!(ids, vec![2]);
    }
}
