//! Admin portal: dashboard, clinics, staff links and partner hotels.

use validator::Validate;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser, Portal};
use crate::domain::clinic::{Clinic, UpdateClinic};
use crate::domain::hotel::Hotel;
use crate::domain::types::{ClinicId, HotelId, UserId};
use crate::domain::user::User;
use crate::dto::ListQuery;
use crate::forms::admin::{ClinicForm, HotelForm, StaffForm};
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use crate::repository::errors::RepositoryError;
use crate::repository::{
    ClinicListQuery, ClinicReader, ClinicWriter, DashboardStats, HotelReader, HotelWriter,
    StatsReader, UserReader,
};
use crate::services::{ServiceError, ServiceResult, ensure_role};

pub fn dashboard<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<DashboardStats>
where
    R: StatsReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    repo.dashboard_stats().map_err(|err| {
        log::error!("Failed to load dashboard stats: {err}");
        err.into()
    })
}

pub fn list_clinics<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<Paginated<Clinic>>
where
    R: ClinicReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let page = query.page.unwrap_or(1);
    let mut list_query = ClinicListQuery::default().paginate(page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        list_query = list_query.search(term);
    }
    let (total, clinics) = repo.list_clinics(list_query)?;
    Ok(Paginated::new(clinics, page, total, DEFAULT_ITEMS_PER_PAGE))
}

fn duplicate_slug(err: RepositoryError, name: &str) -> ServiceError {
    match err {
        RepositoryError::ConstraintViolation(_) => {
            ServiceError::Conflict(format!("A clinic called {name} already exists."))
        }
        other => {
            log::error!("Failed to save clinic {name}: {other}");
            other.into()
        }
    }
}

fn validated_clinic(form: &ClinicForm) -> ServiceResult<()> {
    if let Err(err) = form.validate() {
        log::error!("Failed to validate clinic form: {err}");
        return Err(ServiceError::Form("Please check the clinic details.".to_string()));
    }
    Ok(())
}

pub fn create_clinic<R>(repo: &R, user: &AuthenticatedUser, form: ClinicForm) -> ServiceResult<Clinic>
where
    R: ClinicWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    validated_clinic(&form)?;
    let new_clinic = form.to_new_clinic()?;
    repo.create_clinic(&new_clinic)
        .map_err(|err| duplicate_slug(err, &form.name))
}

pub fn update_clinic<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
    form: ClinicForm,
) -> ServiceResult<Clinic>
where
    R: ClinicWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    validated_clinic(&form)?;
    let updates = UpdateClinic::from(form.to_new_clinic()?);
    repo.update_clinic(ClinicId::new(clinic_id)?, &updates)
        .map_err(|err| duplicate_slug(err, &form.name))
}

/// Clinic with its staff and the clinic users that could be linked.
pub fn clinic_staff<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
) -> ServiceResult<(Clinic, Vec<User>, Vec<User>)>
where
    R: ClinicReader + UserReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let clinic = repo
        .get_clinic_by_id(ClinicId::new(clinic_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let staff = repo.list_clinic_staff(clinic.id)?;
    let candidates = repo
        .list_users(Some(Portal::Clinic))?
        .into_iter()
        .filter(|candidate| !staff.iter().any(|member| member.id == candidate.id))
        .collect();
    Ok((clinic, staff, candidates))
}

/// Links a clinic-portal user to a clinic.
pub fn assign_staff<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
    form: StaffForm,
) -> ServiceResult<()>
where
    R: ClinicReader + ClinicWriter + UserReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let clinic_id = ClinicId::new(clinic_id)?;
    repo.get_clinic_by_id(clinic_id)?.ok_or(ServiceError::NotFound)?;
    let member = repo
        .get_user_by_id(UserId::new(form.user_id)?)?
        .ok_or(ServiceError::NotFound)?;
    if member.portal != Portal::Clinic {
        return Err(ServiceError::Form(format!(
            "{} is not a clinic user.",
            member.email
        )));
    }
    repo.assign_clinic_staff(clinic_id, member.id).map_err(|err| {
        log::error!("Failed to link {} to clinic {clinic_id}: {err}", member.email);
        err.into()
    })
}

pub fn remove_staff<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
    form: StaffForm,
) -> ServiceResult<()>
where
    R: ClinicWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    repo.remove_clinic_staff(ClinicId::new(clinic_id)?, UserId::new(form.user_id)?)
        .map_err(|err| {
            log::error!("Failed to unlink user {}: {err}", form.user_id);
            err.into()
        })
}

pub fn list_users<R>(
    repo: &R,
    user: &AuthenticatedUser,
    portal: Option<String>,
) -> ServiceResult<Vec<User>>
where
    R: UserReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let portal = match portal.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => Some(Portal::try_from(raw)?),
        None => None,
    };
    Ok(repo.list_users(portal)?)
}

/// Every partner hotel, including inactive ones.
pub fn list_all_hotels<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Hotel>>
where
    R: HotelReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    Ok(repo.list_hotels(None, false)?)
}

pub fn create_hotel<R>(repo: &R, user: &AuthenticatedUser, form: HotelForm) -> ServiceResult<Hotel>
where
    R: HotelWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    if let Err(err) = form.validate() {
        log::error!("Failed to validate hotel form: {err}");
        return Err(ServiceError::Form("Please check the hotel details.".to_string()));
    }
    let hotel = form.to_new_hotel()?;
    repo.create_hotel(&hotel).map_err(|err| {
        log::error!("Failed to create hotel: {err}");
        err.into()
    })
}

pub fn set_hotel_active<R>(
    repo: &R,
    user: &AuthenticatedUser,
    hotel_id: i32,
    active: bool,
) -> ServiceResult<()>
where
    R: HotelWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    Ok(repo.set_hotel_active(HotelId::new(hotel_id)?, active)?)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::repository::mock::MockRepository;
    use crate::services::test_support::{admin_claims, clinic, clinic_claims, user};

    fn clinic_form() -> ClinicForm {
        ClinicForm {
            name: "Smile Istanbul".into(),
            city: "Istanbul".into(),
            address: None,
            description: None,
            rating: 47,
            price_factor: 90,
            verified: Some("on".into()),
        }
    }

    #[test]
    fn duplicate_clinic_is_a_conflict() {
        let mut repo = MockRepository::new();
        repo.expect_create_clinic()
            .returning(|_| Err(RepositoryError::ConstraintViolation("slug".into())));
        let result = create_clinic(&repo, &admin_claims(), clinic_form());
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn only_clinic_users_become_staff() {
        let mut repo = MockRepository::new();
        repo.expect_get_clinic_by_id()
            .returning(|id| Ok(Some(clinic(id.get(), "Alpha Dental", 45, 100))));
        repo.expect_get_user_by_id()
            .returning(|id| Ok(Some(user(id.get(), "patient@example.com", Portal::Patient))));
        repo.expect_assign_clinic_staff().never();
        let result = assign_staff(&repo, &admin_claims(), 1, StaffForm { user_id: 9 });
        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn staff_links_clinic_user() {
        let mut repo = MockRepository::new();
        repo.expect_get_clinic_by_id()
            .returning(|id| Ok(Some(clinic(id.get(), "Alpha Dental", 45, 100))));
        repo.expect_get_user_by_id()
            .returning(|id| Ok(Some(user(id.get(), "staff@clinic.example", Portal::Clinic))));
        repo.expect_assign_clinic_staff()
            .times(1)
            .returning(|_, _| Ok(()));
        assign_staff(&repo, &admin_claims(), 1, StaffForm { user_id: 20 }).unwrap();
    }

    #[test]
    fn dashboard_is_admin_only() {
        let repo = MockRepository::new();
        assert!(matches!(
            dashboard(&repo, &clinic_claims()),
            Err(ServiceError::Unauthorized)
        ));
    }
}
