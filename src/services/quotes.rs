//! Quote requests across the three portals and plan acceptance.

use chrono::NaiveDate;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser, PATIENT_ROLE};
use crate::domain::booking::{Booking, NewBooking, generate_reference, validate_arrival};
use crate::domain::clinic::Clinic;
use crate::domain::pricing::{deposit_for, savings_percent, uk_price};
use crate::domain::quote::{QuoteRequest, QuoteStatus};
use crate::domain::treatment_plan::PlanStatus;
use crate::domain::types::{ClinicId, PlanId, QuoteId};
use crate::dto::ListQuery;
use crate::dto::quotes::{PlanView, QuoteListPage, QuotePageData};
use crate::forms::bookings::AcceptPlanForm;
use crate::models::zmq::DentalEvent;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use crate::repository::{
    ClinicReader, PlanReader, PlanWriter, QuoteListQuery, QuoteReader, QuoteWriter,
    TreatmentReader, UserReader, UserWriter,
};
use crate::services::catalog::clinic_price_list;
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::{
    clinic_staff_ids, current_user, ensure_clinic_access, resolve_staff_clinic,
};
use crate::services::{ServiceError, ServiceResult, ensure_role};

fn status_filter(raw: &Option<String>) -> Option<QuoteStatus> {
    let raw = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match QuoteStatus::try_from(raw) {
        Ok(status) => Some(status),
        Err(err) => {
            log::warn!("Ignoring quote status filter: {err}");
            None
        }
    }
}

fn paginate(query: &ListQuery, list_query: QuoteListQuery) -> (usize, QuoteListQuery) {
    let page = query.page.unwrap_or(1);
    let mut list_query = list_query.paginate(page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = status_filter(&query.status) {
        list_query = list_query.status(status);
    }
    (page, list_query)
}

fn list_page<R>(repo: &R, query: &ListQuery, list_query: QuoteListQuery) -> ServiceResult<QuoteListPage>
where
    R: QuoteReader + ?Sized,
{
    let (page, list_query) = paginate(query, list_query);
    let (total, quotes) = repo.list_quotes(list_query)?;
    Ok(QuoteListPage {
        quotes: Paginated::new(quotes, page, total, DEFAULT_ITEMS_PER_PAGE),
        status_filter: status_filter(&query.status).map(|s| s.as_str().to_string()),
    })
}

/// Patient owner, staff of the assigned clinic, or an admin.
pub fn ensure_quote_access<R>(
    repo: &R,
    user: &AuthenticatedUser,
    quote: &QuoteRequest,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + ?Sized,
{
    if user.is_admin() {
        return Ok(());
    }
    let local = current_user(repo, user)?;
    if local.id == quote.patient_id {
        return Ok(());
    }
    match quote.clinic_id {
        Some(clinic_id) => ensure_clinic_access(repo, user, clinic_id).map_err(|_| ServiceError::NotFound),
        None => Err(ServiceError::NotFound),
    }
}

fn load_quote<R>(repo: &R, quote_id: i32) -> ServiceResult<QuoteRequest>
where
    R: QuoteReader + ?Sized,
{
    repo.get_quote_by_id(QuoteId::new(quote_id)?)?
        .ok_or(ServiceError::NotFound)
}

/// Quote owned by the signed-in patient; other quotes read as missing.
fn own_quote<R>(repo: &R, user: &AuthenticatedUser, quote_id: QuoteId) -> ServiceResult<QuoteRequest>
where
    R: UserReader + UserWriter + QuoteReader + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    let quote = repo.get_quote_by_id(quote_id)?.ok_or(ServiceError::NotFound)?;
    if user.is_admin() {
        return Ok(quote);
    }
    let local = current_user(repo, user)?;
    if quote.patient_id != local.id {
        return Err(ServiceError::NotFound);
    }
    Ok(quote)
}

fn quote_page<R>(
    repo: &R,
    quote: QuoteRequest,
    include_drafts: bool,
) -> ServiceResult<(QuotePageData, Option<Clinic>)>
where
    R: ClinicReader + PlanReader + ?Sized,
{
    let clinic = match quote.clinic_id {
        Some(id) => repo.get_clinic_by_id(id)?,
        None => None,
    };
    let plans = repo
        .list_plans_for_quote(quote.id)?
        .into_iter()
        .filter(|plan| include_drafts || plan.status != PlanStatus::Draft)
        .map(PlanView::from)
        .collect();
    let uk_total = uk_price(quote.subtotal);
    let page = QuotePageData {
        savings_percent: savings_percent(quote.total, uk_total),
        uk_total,
        clinic: clinic.clone(),
        plans,
        quote,
        price_list: Vec::new(),
    };
    Ok((page, clinic))
}

pub fn list_patient_quotes<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<QuoteListPage>
where
    R: UserReader + UserWriter + QuoteReader + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    let local = current_user(repo, user)?;
    list_page(repo, &query, QuoteListQuery::default().patient(local.id))
}

pub fn load_patient_quote<R>(
    repo: &R,
    user: &AuthenticatedUser,
    quote_id: i32,
) -> ServiceResult<QuotePageData>
where
    R: UserReader + UserWriter + QuoteReader + ClinicReader + PlanReader + ?Sized,
{
    let quote = own_quote(repo, user, QuoteId::new(quote_id)?)?;
    Ok(quote_page(repo, quote, false)?.0)
}

/// Cancels an open quote of the signed-in patient.
pub fn cancel_quote<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    quote_id: i32,
) -> ServiceResult<QuoteRequest>
where
    R: UserReader + UserWriter + QuoteReader + QuoteWriter + ClinicReader + ?Sized,
    P: EventPublisher + ?Sized,
{
    let quote = own_quote(repo, user, QuoteId::new(quote_id)?)?;
    if !quote.status.is_cancellable() {
        return Err(ServiceError::Conflict(format!(
            "A {} quote cannot be cancelled.",
            quote.status
        )));
    }
    let updated = repo
        .update_quote_status(quote.id, QuoteStatus::Cancelled)
        .map_err(|err| {
            log::error!("Failed to cancel quote {}: {err}", quote.id);
            ServiceError::from(err)
        })?;

    if let Some(clinic_id) = updated.clinic_id {
        publish_quietly(
            publisher,
            DentalEvent::QuoteUpdated {
                quote_id: updated.id.get(),
                status: updated.status.as_str().to_string(),
                notify: clinic_staff_ids(repo, clinic_id),
            },
        );
    }
    Ok(updated)
}

/// Accepts a sent plan and opens a pending booking with the deposit due.
pub fn accept_plan<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    plan_id: i32,
    form: AcceptPlanForm,
    today: NaiveDate,
) -> ServiceResult<Booking>
where
    R: UserReader + UserWriter + QuoteReader + ClinicReader + PlanReader + PlanWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    let plan = repo
        .get_plan_by_id(PlanId::new(plan_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let quote = own_quote(repo, user, plan.quote_id)?;

    if plan.status != PlanStatus::Sent {
        return Err(ServiceError::Conflict(
            "Only plans sent by the clinic can be accepted.".to_string(),
        ));
    }
    if !matches!(quote.status, QuoteStatus::Pending | QuoteStatus::Quoted) {
        return Err(ServiceError::Conflict(format!(
            "The quote is already {}.",
            quote.status
        )));
    }

    let arrival_date = form.arrival_date()?;
    validate_arrival(arrival_date, today)?;

    let total = plan.total();
    let new_booking = NewBooking {
        reference: generate_reference(),
        patient_id: quote.patient_id,
        clinic_id: plan.clinic_id,
        plan_id: plan.id,
        total,
        deposit: deposit_for(total),
        arrival_date,
    };
    let booking = repo.accept_plan(plan.id, &new_booking).map_err(|err| {
        log::error!("Failed to accept plan {}: {err}", plan.id);
        ServiceError::from(err)
    })?;

    publish_quietly(
        publisher,
        DentalEvent::BookingStatusChanged {
            booking_id: booking.id.get(),
            reference: booking.reference.clone(),
            status: booking.status.as_str().to_string(),
            notify: clinic_staff_ids(repo, booking.clinic_id),
        },
    );
    Ok(booking)
}

/// Quotes assigned to the clinic the portal is showing.
pub fn list_clinic_quotes<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<(Clinic, Vec<Clinic>, QuoteListPage)>
where
    R: UserReader + UserWriter + ClinicReader + QuoteReader + ?Sized,
{
    let (clinic, clinics) = resolve_staff_clinic(repo, user, query.clinic)?;
    let page = list_page(repo, &query, QuoteListQuery::default().clinic(clinic.id))?;
    Ok((clinic, clinics, page))
}

/// Quote detail for clinic staff, with the clinic price list for the plan editor.
pub fn load_clinic_quote<R>(
    repo: &R,
    user: &AuthenticatedUser,
    quote_id: i32,
) -> ServiceResult<QuotePageData>
where
    R: UserReader + UserWriter + ClinicReader + QuoteReader + PlanReader + TreatmentReader + ?Sized,
{
    let quote = load_quote(repo, quote_id)?;
    let clinic_id = quote.clinic_id.ok_or(ServiceError::NotFound)?;
    ensure_clinic_access(repo, user, clinic_id)?;
    let (mut page, clinic) = quote_page(repo, quote, true)?;
    if let Some(clinic) = clinic {
        page.price_list = clinic_price_list(repo, &clinic)?;
    }
    Ok(page)
}

pub fn list_all_quotes<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ListQuery,
) -> ServiceResult<QuoteListPage>
where
    R: QuoteReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    list_page(repo, &query, QuoteListQuery::default())
}

pub fn load_admin_quote<R>(
    repo: &R,
    user: &AuthenticatedUser,
    quote_id: i32,
) -> ServiceResult<QuotePageData>
where
    R: QuoteReader + ClinicReader + PlanReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let quote = load_quote(repo, quote_id)?;
    Ok(quote_page(repo, quote, true)?.0)
}

/// Routes a pending quote to a clinic.
pub fn assign_quote<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    quote_id: i32,
    clinic_id: i32,
) -> ServiceResult<QuoteRequest>
where
    R: QuoteReader + QuoteWriter + ClinicReader + ?Sized,
    P: EventPublisher + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let quote = load_quote(repo, quote_id)?;
    if quote.status != QuoteStatus::Pending {
        return Err(ServiceError::Conflict(
            "Only pending quotes can be assigned.".to_string(),
        ));
    }
    let clinic = repo
        .get_clinic_by_id(ClinicId::new(clinic_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let updated = repo.assign_quote_clinic(quote.id, clinic.id).map_err(|err| {
        log::error!("Failed to assign quote {} to {}: {err}", quote.id, clinic.id);
        ServiceError::from(err)
    })?;

    let mut notify = clinic_staff_ids(repo, clinic.id);
    notify.push(updated.patient_id.get());
    publish_quietly(
        publisher,
        DentalEvent::QuoteUpdated {
            quote_id: updated.id.get(),
            status: updated.status.as_str().to_string(),
            notify,
        },
    );
    Ok(updated)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::auth::Portal;
    use crate::domain::booking::BookingStatus;
    use crate::domain::quote::PatientInfo;
    use crate::domain::treatment_plan::{TreatmentPlan, TreatmentPlanLine};
    use crate::domain::types::{
        BookingId, Email, Money, PersonName, PlanLineId, SafeText, UserId,
    };
    use crate::repository::mock::MockRepository;
    use crate::services::events::recording::RecordingPublisher;
    use crate::services::test_support::{admin_claims, now, patient_claims, user};

    fn quote(status: QuoteStatus, patient: i32) -> QuoteRequest {
        QuoteRequest {
            id: QuoteId::new(10).unwrap(),
            patient_id: UserId::new(patient).unwrap(),
            clinic_id: Some(ClinicId::new(1).unwrap()),
            status,
            promo_code: None,
            subtotal: Money::from_pounds(2000),
            discount: Money::ZERO,
            total: Money::from_pounds(2000),
            patient: PatientInfo {
                name: PersonName::new("Jane").unwrap(),
                email: Email::new("patient@example.com").unwrap(),
                phone: None,
                travel_month: None,
                notes: None,
            },
            lines: vec![],
            created_at: now(),
            updated_at: now(),
        }
    }

    fn plan(status: PlanStatus) -> TreatmentPlan {
        let plan_id = PlanId::new(4).unwrap();
        TreatmentPlan {
            id: plan_id,
            quote_id: QuoteId::new(10).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            patient_id: UserId::new(9).unwrap(),
            version: 2,
            status,
            notes: None,
            lines: vec![TreatmentPlanLine {
                id: PlanLineId::new(1).unwrap(),
                plan_id,
                treatment_id: None,
                description: SafeText::new("Implant").unwrap(),
                quantity: 2,
                unit_price: Money::from_pounds(450),
            }],
            created_at: now(),
            updated_at: now(),
        }
    }

    fn patient_repo() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(9, email.as_str(), Portal::Patient))));
        repo
    }

    #[test]
    fn accepted_quotes_cannot_be_cancelled() {
        let mut repo = patient_repo();
        repo.expect_get_quote_by_id()
            .returning(|_| Ok(Some(quote(QuoteStatus::Accepted, 9))));
        let publisher = RecordingPublisher::default();
        let result = cancel_quote(&repo, &publisher, &patient_claims(), 10);
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn foreign_quotes_read_as_missing() {
        let mut repo = patient_repo();
        repo.expect_get_quote_by_id()
            .returning(|_| Ok(Some(quote(QuoteStatus::Pending, 77))));
        let result = load_patient_quote(&repo, &patient_claims(), 10);
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn accepting_a_plan_books_with_deposit() {
        let mut repo = patient_repo();
        repo.expect_get_plan_by_id()
            .returning(|_| Ok(Some(plan(PlanStatus::Sent))));
        repo.expect_get_quote_by_id()
            .returning(|_| Ok(Some(quote(QuoteStatus::Quoted, 9))));
        repo.expect_accept_plan()
            .times(1)
            .withf(|_, booking| {
                booking.total == Money::from_pounds(900)
                    && booking.deposit == Money::from_pounds(200)
                    && booking.reference.len() == 8
            })
            .returning(|plan_id, booking| {
                Ok(Booking {
                    id: BookingId::new(3).unwrap(),
                    reference: booking.reference.clone(),
                    patient_id: booking.patient_id,
                    clinic_id: booking.clinic_id,
                    plan_id,
                    status: BookingStatus::Pending,
                    total: booking.total,
                    deposit: booking.deposit,
                    arrival_date: booking.arrival_date,
                    created_at: now(),
                    updated_at: now(),
                })
            });
        repo.expect_list_clinic_staff()
            .returning(|_| Ok(vec![user(20, "staff@clinic.example", Portal::Clinic)]));
        let publisher = RecordingPublisher::default();

        let booking = accept_plan(
            &repo,
            &publisher,
            &patient_claims(),
            4,
            AcceptPlanForm { arrival_date: None },
            now().date(),
        )
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(publisher.published()[0].recipients(), &[20]);
    }

    #[test]
    fn draft_plans_cannot_be_accepted() {
        let mut repo = patient_repo();
        repo.expect_get_plan_by_id()
            .returning(|_| Ok(Some(plan(PlanStatus::Draft))));
        repo.expect_get_quote_by_id()
            .returning(|_| Ok(Some(quote(QuoteStatus::Pending, 9))));
        let publisher = RecordingPublisher::default();
        let result = accept_plan(
            &repo,
            &publisher,
            &patient_claims(),
            4,
            AcceptPlanForm { arrival_date: None },
            now().date(),
        );
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn only_pending_quotes_are_assigned() {
        let mut repo = MockRepository::new();
        repo.expect_get_quote_by_id()
            .returning(|_| Ok(Some(quote(QuoteStatus::Quoted, 9))));
        let publisher = RecordingPublisher::default();
        let result = assign_quote(&repo, &publisher, &admin_claims(), 10, 2);
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }
}
