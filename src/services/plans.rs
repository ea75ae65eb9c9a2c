//! Treatment plan versions written by clinics.

use validator::Validate;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::quote::QuoteStatus;
use crate::domain::treatment_plan::{NewTreatmentPlan, PlanStatus, TreatmentPlan, TreatmentPlanLine};
use crate::domain::types::{PlanId, PlanLineId, QuoteId, SafeText};
use crate::forms::plans::{CreatePlanForm, PlanLineForm};
use crate::models::zmq::DentalEvent;
use crate::repository::{
    ClinicReader, PlanReader, PlanWriter, QuoteReader, QuoteWriter, UserReader, UserWriter,
};
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::{clinic_staff_ids, current_user, ensure_clinic_access};
use crate::services::{ServiceError, ServiceResult};

fn load_plan<R>(repo: &R, plan_id: PlanId) -> ServiceResult<TreatmentPlan>
where
    R: PlanReader + ?Sized,
{
    repo.get_plan_by_id(plan_id)?.ok_or(ServiceError::NotFound)
}

/// Draft plan of a clinic the user works for.
fn editable_plan<R>(repo: &R, user: &AuthenticatedUser, plan_id: PlanId) -> ServiceResult<TreatmentPlan>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + ?Sized,
{
    let plan = load_plan(repo, plan_id)?;
    ensure_clinic_access(repo, user, plan.clinic_id)?;
    if plan.status != PlanStatus::Draft {
        return Err(ServiceError::Conflict(format!(
            "Plan v{} is {} and can no longer be edited.",
            plan.version,
            plan.status
        )));
    }
    Ok(plan)
}

fn validate_line(form: &PlanLineForm) -> ServiceResult<()> {
    if let Err(err) = form.validate() {
        log::error!("Failed to validate plan line: {err}");
        return Err(ServiceError::Form("Please check the plan line.".to_string()));
    }
    Ok(())
}

/// Creates the next Draft version for a quote assigned to the user's clinic.
pub fn create_plan<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: CreatePlanForm,
) -> ServiceResult<TreatmentPlan>
where
    R: UserReader + UserWriter + ClinicReader + QuoteReader + PlanWriter + ?Sized,
{
    if let Err(err) = form.validate() {
        log::error!("Failed to validate plan form: {err}");
        return Err(ServiceError::Form("Please check the plan details.".to_string()));
    }
    let quote = repo
        .get_quote_by_id(QuoteId::new(form.quote_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let clinic_id = quote.clinic_id.ok_or(ServiceError::Conflict(
        "The quote has not been assigned to a clinic.".to_string(),
    ))?;
    ensure_clinic_access(repo, user, clinic_id)?;
    if !matches!(quote.status, QuoteStatus::Pending | QuoteStatus::Quoted) {
        return Err(ServiceError::Conflict(format!(
            "The quote is {} and takes no new plans.",
            quote.status
        )));
    }

    let lines = form.lines()?;
    if lines.is_empty() {
        return Err(ServiceError::Form("A plan needs at least one line.".to_string()));
    }
    let new_plan = NewTreatmentPlan {
        quote_id: quote.id,
        clinic_id,
        patient_id: quote.patient_id,
        notes: SafeText::optional(form.notes.clone())?,
        lines,
    };
    repo.create_plan(&new_plan).map_err(|err| {
        log::error!("Failed to create plan for quote {}: {err}", quote.id);
        err.into()
    })
}

pub fn load_editable_plan<R>(
    repo: &R,
    user: &AuthenticatedUser,
    plan_id: i32,
) -> ServiceResult<TreatmentPlan>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + ?Sized,
{
    let plan = load_plan(repo, PlanId::new(plan_id)?)?;
    ensure_clinic_access(repo, user, plan.clinic_id)?;
    Ok(plan)
}

pub fn add_line<R>(
    repo: &R,
    user: &AuthenticatedUser,
    plan_id: i32,
    form: PlanLineForm,
) -> ServiceResult<TreatmentPlanLine>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + PlanWriter + ?Sized,
{
    validate_line(&form)?;
    let plan = editable_plan(repo, user, PlanId::new(plan_id)?)?;
    let line = form.to_new_line()?;
    repo.add_plan_line(plan.id, &line).map_err(|err| {
        log::error!("Failed to add line to plan {}: {err}", plan.id);
        err.into()
    })
}

fn line_with_plan<R>(
    repo: &R,
    user: &AuthenticatedUser,
    line_id: i32,
) -> ServiceResult<(TreatmentPlanLine, TreatmentPlan)>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + ?Sized,
{
    let line = repo
        .get_plan_line(PlanLineId::new(line_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let plan = editable_plan(repo, user, line.plan_id)?;
    Ok((line, plan))
}

pub fn update_line<R>(
    repo: &R,
    user: &AuthenticatedUser,
    line_id: i32,
    form: PlanLineForm,
) -> ServiceResult<TreatmentPlanLine>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + PlanWriter + ?Sized,
{
    validate_line(&form)?;
    let (line, _) = line_with_plan(repo, user, line_id)?;
    let updates = form.to_new_line()?;
    repo.update_plan_line(line.id, &updates).map_err(|err| {
        log::error!("Failed to update plan line {}: {err}", line.id);
        err.into()
    })
}

pub fn delete_line<R>(repo: &R, user: &AuthenticatedUser, line_id: i32) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + PlanWriter + ?Sized,
{
    let (line, _) = line_with_plan(repo, user, line_id)?;
    repo.delete_plan_line(line.id).map_err(|err| {
        log::error!("Failed to delete plan line {}: {err}", line.id);
        err.into()
    })
}

/// Sends a Draft plan to the patient and marks the quote as quoted.
pub fn send_plan<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    plan_id: i32,
) -> ServiceResult<TreatmentPlan>
where
    R: UserReader + UserWriter + ClinicReader + QuoteReader + QuoteWriter + PlanReader + PlanWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    let plan = editable_plan(repo, user, PlanId::new(plan_id)?)?;
    if plan.lines.is_empty() {
        return Err(ServiceError::Form("Add at least one line before sending.".to_string()));
    }
    let quote = repo
        .get_quote_by_id(plan.quote_id)?
        .ok_or(ServiceError::NotFound)?;
    if !matches!(quote.status, QuoteStatus::Pending | QuoteStatus::Quoted) {
        return Err(ServiceError::Conflict(format!("The quote is {}.", quote.status)));
    }

    let sent = repo.update_plan_status(plan.id, PlanStatus::Sent)?;
    if quote.status != QuoteStatus::Quoted {
        repo.update_quote_status(quote.id, QuoteStatus::Quoted)?;
    }
    publish_quietly(
        publisher,
        DentalEvent::QuoteUpdated {
            quote_id: quote.id.get(),
            status: QuoteStatus::Quoted.as_str().to_string(),
            notify: vec![quote.patient_id.get()],
        },
    );
    Ok(sent)
}

/// Patient turns down a sent plan.
pub fn reject_plan<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    plan_id: i32,
) -> ServiceResult<TreatmentPlan>
where
    R: UserReader + UserWriter + ClinicReader + PlanReader + PlanWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    let plan = load_plan(repo, PlanId::new(plan_id)?)?;
    if !user.is_admin() && current_user(repo, user)?.id != plan.patient_id {
        return Err(ServiceError::NotFound);
    }
    if plan.status != PlanStatus::Sent {
        return Err(ServiceError::Conflict(
            "Only plans awaiting your answer can be declined.".to_string(),
        ));
    }
    let rejected = repo.update_plan_status(plan.id, PlanStatus::Rejected)?;
    publish_quietly(
        publisher,
        DentalEvent::QuoteUpdated {
            quote_id: plan.quote_id.get(),
            status: "plan_rejected".to_string(),
            notify: clinic_staff_ids(repo, plan.clinic_id),
        },
    );
    Ok(rejected)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::auth::Portal;
    use crate::domain::types::{ClinicId, Money, UserId};
    use crate::repository::mock::MockRepository;
    use crate::services::events::recording::RecordingPublisher;
    use crate::services::test_support::{clinic, clinic_claims, now, user};

    fn plan(status: PlanStatus) -> TreatmentPlan {
        TreatmentPlan {
            id: PlanId::new(4).unwrap(),
            quote_id: QuoteId::new(10).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            patient_id: UserId::new(9).unwrap(),
            version: 1,
            status,
            notes: None,
            lines: vec![],
            created_at: now(),
            updated_at: now(),
        }
    }

    fn staff_repo() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(20, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));
        repo
    }

    fn line_form() -> PlanLineForm {
        PlanLineForm {
            treatment_id: None,
            description: "Zirconia crown".into(),
            quantity: 2,
            unit_price: "180".into(),
        }
    }

    #[test]
    fn sent_plans_are_read_only() {
        let mut repo = staff_repo();
        repo.expect_get_plan_line().returning(|id| {
            Ok(Some(TreatmentPlanLine {
                id,
                plan_id: PlanId::new(4).unwrap(),
                treatment_id: None,
                description: SafeText::new("Crown").unwrap(),
                quantity: 1,
                unit_price: Money::from_pounds(180),
            }))
        });
        repo.expect_get_plan_by_id()
            .returning(|_| Ok(Some(plan(PlanStatus::Sent))));

        let result = update_line(&repo, &clinic_claims(), 1, line_form());
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn draft_lines_are_editable() {
        let mut repo = staff_repo();
        repo.expect_get_plan_by_id()
            .returning(|_| Ok(Some(plan(PlanStatus::Draft))));
        repo.expect_add_plan_line()
            .times(1)
            .withf(|_, line| line.unit_price == Money::from_pounds(180) && line.quantity == 2)
            .returning(|plan_id, line| {
                Ok(TreatmentPlanLine {
                    id: PlanLineId::new(7).unwrap(),
                    plan_id,
                    treatment_id: line.treatment_id,
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            });

        let line = add_line(&repo, &clinic_claims(), 4, line_form()).unwrap();
        assert_eq!(line.total(), Money::from_pounds(360));
    }

    #[test]
    fn empty_plans_are_not_sent() {
        let mut repo = staff_repo();
        repo.expect_get_plan_by_id()
            .returning(|_| Ok(Some(plan(PlanStatus::Draft))));
        let publisher = RecordingPublisher::default();
        let result = send_plan(&repo, &publisher, &clinic_claims(), 4);
        assert!(matches!(result, Err(ServiceError::Form(_))));
        assert!(publisher.published().is_empty());
    }
}
