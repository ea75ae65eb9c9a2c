//! Patient dental charts.

use crate::domain::auth::{AuthenticatedUser, PATIENT_ROLE};
use crate::domain::dental_chart::DentalChart;
use crate::domain::types::UserId;
use crate::forms::dental_chart::DentalChartPayload;
use crate::repository::{
    BookingReader, ClinicReader, DentalChartReader, DentalChartWriter, UserReader, UserWriter,
};
use crate::services::documents::ensure_patient_record_access;
use crate::services::users::current_user;
use crate::services::{ServiceResult, ensure_role};

/// Chart of `patient_id`, or the user's own chart. Missing charts are empty.
pub fn load_chart<R>(
    repo: &R,
    user: &AuthenticatedUser,
    patient_id: Option<i32>,
) -> ServiceResult<DentalChart>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + DentalChartReader + ?Sized,
{
    let patient_id = match patient_id {
        Some(id) => {
            let id = UserId::new(id)?;
            ensure_patient_record_access(repo, user, id)?;
            id
        }
        None => current_user(repo, user)?.id,
    };
    Ok(repo
        .get_dental_chart(patient_id)?
        .unwrap_or_else(|| DentalChart::empty(patient_id)))
}

/// Replaces the signed-in patient's chart.
pub fn save_chart<R>(
    repo: &R,
    user: &AuthenticatedUser,
    payload: DentalChartPayload,
) -> ServiceResult<DentalChart>
where
    R: UserReader + UserWriter + DentalChartWriter + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    let teeth = payload.teeth()?;
    let local = current_user(repo, user)?;
    repo.save_dental_chart(local.id, &teeth).map_err(|err| {
        log::error!("Failed to save dental chart for {}: {err}", user.email);
        err.into()
    })
}
