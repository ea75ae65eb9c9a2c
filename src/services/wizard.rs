//! Quote wizard operations.
//!
//! Every function mutates an owned [`QuoteWizard`]; callers persist the
//! snapshot only when the operation succeeds so a rejected step leaves the
//! last good state in the caller's draft.

use chrono::{Duration, NaiveDateTime};
use validator::Validate;

use crate::domain::auth::{AuthenticatedUser, PATIENT_ROLE};
use crate::domain::pricing::{PromoDiscount, lookup_promo};
use crate::domain::quote::{NewQuoteLine, NewQuoteRequest, QuoteRequest};
use crate::domain::quote_wizard::{QuoteWizard, WizardLine, WizardStep};
use crate::domain::treatment::Treatment;
use crate::domain::types::{ClinicId, Money, PackageId, PromoCode, TreatmentId};
use crate::dto::quotes::{WizardPageData, WizardSummary};
use crate::forms::quote::{AddTreatmentForm, PatientInfoForm, PromoForm, SetQuantityForm};
use crate::models::zmq::DentalEvent;
use crate::repository::{
    ClinicListQuery, ClinicReader, OfferReader, PackageListQuery, PackageReader,
    QuoteDraftReader, QuoteDraftWriter, QuoteWriter, TreatmentReader, UserReader, UserWriter,
};
use crate::services::catalog::clinic_pricer;
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::{admin_ids, clinic_staff_ids, current_user};
use crate::services::{ServiceError, ServiceResult, ensure_role};

/// Session key holding the token of the caller's wizard draft.
pub const SESSION_KEY: &str = "quote_draft";

/// Drafts untouched for this many days are pruned on save.
pub const DRAFT_RETENTION_DAYS: i64 = 30;

/// Restores the draft stored under `token`, or a fresh wizard.
pub fn load_draft<R>(repo: &R, token: Option<&str>) -> QuoteWizard
where
    R: QuoteDraftReader + ?Sized,
{
    let Some(token) = token else {
        return QuoteWizard::default();
    };
    match repo.get_quote_draft(token) {
        Ok(raw) => QuoteWizard::restore_or_default(raw.as_deref()),
        Err(err) => {
            log::error!("Failed to load quote draft: {err}");
            QuoteWizard::default()
        }
    }
}

pub fn save_draft<R>(
    repo: &R,
    token: &str,
    wizard: &QuoteWizard,
    now: NaiveDateTime,
) -> ServiceResult<()>
where
    R: QuoteDraftWriter + ?Sized,
{
    let snapshot = wizard
        .to_snapshot_at(now)
        .map_err(|err| ServiceError::Internal(format!("wizard snapshot: {err}")))?;
    repo.save_quote_draft(token, &snapshot)?;

    match repo.delete_quote_drafts_before(now - Duration::days(DRAFT_RETENTION_DAYS)) {
        Ok(0) => {}
        Ok(removed) => log::info!("Pruned {removed} stale quote drafts"),
        Err(err) => log::warn!("Failed to prune quote drafts: {err}"),
    }
    Ok(())
}

pub fn discard_draft<R>(repo: &R, token: &str)
where
    R: QuoteDraftWriter + ?Sized,
{
    if let Err(err) = repo.delete_quote_draft(token) {
        log::warn!("Failed to discard quote draft: {err}");
    }
}

/// Navigation requested from the wizard footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardNavigation {
    Next,
    Back,
    GoTo(String),
}

pub fn summarize(wizard: &QuoteWizard) -> WizardSummary {
    WizardSummary {
        step: wizard.step.as_str(),
        lines: wizard.lines.clone(),
        promo_code: wizard.promo.as_ref().map(|p| p.code.as_str().to_string()),
        promo_label: wizard.promo.as_ref().map(|p| p.discount.label()),
        patient: wizard.patient.clone(),
        clinic_id: wizard.clinic_id,
        subtotal: wizard.subtotal(),
        discount: wizard.discount(),
        total: wizard.total(),
        uk_total: wizard.uk_total(),
        savings_percent: wizard.savings_percent(),
        reachable_steps: WizardStep::ALL
            .into_iter()
            .filter(|step| wizard.can_enter(*step))
            .map(WizardStep::as_str)
            .collect(),
    }
}

/// Everything the wizard page renders besides the wizard itself.
pub fn load_wizard_page<R>(
    repo: &R,
    wizard: &QuoteWizard,
    category: Option<String>,
) -> ServiceResult<WizardPageData>
where
    R: TreatmentReader + ClinicReader + PackageReader + ?Sized,
{
    let category = category.filter(|c| !c.trim().is_empty());
    let (_, clinics) = repo.list_clinics(ClinicListQuery::default().verified_only())?;
    Ok(WizardPageData {
        summary: summarize(wizard),
        treatments: repo.list_treatments(category)?,
        categories: repo.list_treatment_categories()?,
        clinics,
        packages: repo.list_packages(PackageListQuery::default().active_only())?,
    })
}

/// Unit price of `treatment` for the wizard's current clinic selection.
fn unit_price_for<R>(
    repo: &R,
    clinic_id: Option<ClinicId>,
    treatment: &Treatment,
) -> ServiceResult<Money>
where
    R: ClinicReader + ?Sized,
{
    match clinic_id {
        Some(clinic_id) => {
            let (_, price_of) = clinic_pricer(repo, clinic_id)?;
            Ok(price_of(treatment))
        }
        None => Ok(treatment.base_price),
    }
}

pub fn add_treatment<R>(
    repo: &R,
    wizard: &mut QuoteWizard,
    form: AddTreatmentForm,
) -> ServiceResult<()>
where
    R: TreatmentReader + ClinicReader + ?Sized,
{
    if let Err(err) = form.validate() {
        log::warn!("Rejected wizard treatment: {err}");
        return Err(ServiceError::Form("Choose between 1 and 32 of a treatment.".to_string()));
    }
    let treatment = repo
        .get_treatment_by_id(TreatmentId::new(form.treatment_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let unit_price = unit_price_for(repo, wizard.clinic_id, &treatment)?;
    wizard.add_treatment(WizardLine {
        treatment_id: treatment.id,
        name: treatment.name,
        unit_price,
        quantity: form.quantity,
    })?;
    Ok(())
}

pub fn set_quantity(wizard: &mut QuoteWizard, form: SetQuantityForm) -> ServiceResult<()> {
    if let Err(err) = form.validate() {
        log::warn!("Rejected wizard quantity: {err}");
        return Err(ServiceError::Form("Choose between 0 and 32.".to_string()));
    }
    wizard.set_quantity(TreatmentId::new(form.treatment_id)?, form.quantity)?;
    Ok(())
}

pub fn remove_treatment(wizard: &mut QuoteWizard, treatment_id: i32) -> ServiceResult<()> {
    wizard.remove_treatment(TreatmentId::new(treatment_id)?)?;
    Ok(())
}

/// Resolves a promo code: the built-in table first, then live clinic offers.
pub fn resolve_promo<R>(
    repo: &R,
    code: &PromoCode,
    now: NaiveDateTime,
) -> ServiceResult<Option<PromoDiscount>>
where
    R: OfferReader + ?Sized,
{
    if let Some(discount) = lookup_promo(code) {
        return Ok(Some(discount));
    }
    Ok(repo
        .find_live_offer_by_promo(code, now)?
        .and_then(|offer| u8::try_from(offer.discount_percent).ok())
        .map(PromoDiscount::Percent))
}

pub fn apply_promo<R>(
    repo: &R,
    wizard: &mut QuoteWizard,
    form: PromoForm,
    now: NaiveDateTime,
) -> ServiceResult<PromoDiscount>
where
    R: OfferReader + ?Sized,
{
    if form.validate().is_err() {
        return Err(ServiceError::Form("Enter a promo code.".to_string()));
    }
    let code = form.code()?;
    match resolve_promo(repo, &code, now)? {
        Some(discount) => {
            wizard.apply_promo(code, discount);
            Ok(discount)
        }
        None => {
            log::info!("Unknown promo code {code:?}");
            Err(ServiceError::Form(format!(
                "Promo code {} is not valid.",
                code.as_str()
            )))
        }
    }
}

pub fn clear_promo(wizard: &mut QuoteWizard) {
    wizard.clear_promo();
}

/// Stores patient details and moves on to the review step.
pub fn save_patient_info(wizard: &mut QuoteWizard, form: PatientInfoForm) -> ServiceResult<()> {
    if let Err(err) = form.validate() {
        log::warn!("Rejected patient details: {err}");
        return Err(ServiceError::Form("Please check your contact details.".to_string()));
    }
    wizard.set_patient(form.to_patient_info()?);
    if wizard.step == WizardStep::PatientInfo {
        wizard.next()?;
    }
    Ok(())
}

/// Selects a clinic (or clears the selection) and reprices every line.
pub fn select_clinic<R>(
    repo: &R,
    wizard: &mut QuoteWizard,
    clinic_id: Option<i32>,
) -> ServiceResult<()>
where
    R: TreatmentReader + ClinicReader + ?Sized,
{
    let clinic_id = clinic_id.filter(|id| *id > 0).map(ClinicId::new).transpose()?;
    let ids: Vec<TreatmentId> = wizard.lines.iter().map(|line| line.treatment_id).collect();
    let treatments = repo.get_treatments_by_ids(&ids)?;

    match clinic_id {
        Some(clinic_id) => {
            let (clinic, price_of) = clinic_pricer(repo, clinic_id)?;
            if !clinic.verified {
                return Err(ServiceError::Form(
                    "This clinic is not accepting quotes yet.".to_string(),
                ));
            }
            wizard.select_clinic(Some(clinic_id), |id| {
                treatments.iter().find(|t| t.id == id).map(&price_of)
            });
        }
        None => wizard.select_clinic(None, |id| {
            treatments.iter().find(|t| t.id == id).map(|t| t.base_price)
        }),
    }
    Ok(())
}

/// Replaces the wizard content with a package's treatments and clinic.
pub fn choose_package<R>(repo: &R, wizard: &mut QuoteWizard, package_id: i32) -> ServiceResult<()>
where
    R: TreatmentReader + ClinicReader + PackageReader + ?Sized,
{
    let package = repo
        .get_package_by_id(PackageId::new(package_id)?)?
        .ok_or(ServiceError::NotFound)?;
    if !package.active {
        return Err(ServiceError::NotFound);
    }
    let ids: Vec<TreatmentId> = package.items.iter().map(|item| item.treatment_id).collect();
    let treatments = repo.get_treatments_by_ids(&ids)?;
    let (_, price_of) = clinic_pricer(repo, package.clinic_id)?;

    let mut prefilled = QuoteWizard::new();
    prefilled.clinic_id = Some(package.clinic_id);
    for item in &package.items {
        let Some(treatment) = treatments.iter().find(|t| t.id == item.treatment_id) else {
            log::warn!(
                "Package {} references missing treatment {}",
                package.id,
                item.treatment_id
            );
            continue;
        };
        prefilled.add_treatment(WizardLine {
            treatment_id: treatment.id,
            name: treatment.name.clone(),
            unit_price: price_of(treatment),
            quantity: item.quantity,
        })?;
    }
    // Keep what the patient already typed in.
    prefilled.patient = wizard.patient.take();
    prefilled.promo = wizard.promo.take();
    *wizard = prefilled;
    Ok(())
}

pub fn navigate(wizard: &mut QuoteWizard, navigation: WizardNavigation) -> ServiceResult<WizardStep> {
    let step = match navigation {
        WizardNavigation::Next => wizard.next()?,
        WizardNavigation::Back => wizard.back()?,
        WizardNavigation::GoTo(raw) => {
            let step = WizardStep::try_from(raw.as_str())?;
            wizard.go_to(step)?;
            step
        }
    };
    Ok(step)
}

/// Turns a ready wizard into a quote request and resets the wizard.
///
/// Lines are repriced from the catalog so a stale snapshot cannot set prices.
pub fn submit<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    wizard: &mut QuoteWizard,
    now: NaiveDateTime,
) -> ServiceResult<QuoteRequest>
where
    R: UserReader + UserWriter + TreatmentReader + ClinicReader + OfferReader + QuoteWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    wizard.ensure_ready()?;
    let patient = wizard.patient.clone().ok_or(ServiceError::Form(
        "Please add your contact details.".to_string(),
    ))?;
    let local = current_user(repo, user)?;

    let ids: Vec<TreatmentId> = wizard.lines.iter().map(|line| line.treatment_id).collect();
    let treatments = repo.get_treatments_by_ids(&ids)?;
    let pricer = match wizard.clinic_id {
        Some(clinic_id) => Some(clinic_pricer(repo, clinic_id)?.1),
        None => None,
    };

    let mut lines = Vec::with_capacity(wizard.lines.len());
    for line in &wizard.lines {
        let treatment = treatments
            .iter()
            .find(|t| t.id == line.treatment_id)
            .ok_or_else(|| {
                log::warn!("Treatment {} vanished from the catalog", line.treatment_id);
                ServiceError::Form(format!("{} is no longer available.", line.name))
            })?;
        let unit_price = match &pricer {
            Some(price_of) => price_of(treatment),
            None => treatment.base_price,
        };
        lines.push(NewQuoteLine {
            treatment_id: treatment.id,
            name: treatment.name.clone(),
            unit_price,
            quantity: line.quantity,
        });
    }

    // Promo validity is rechecked at submission time.
    let promo = match &wizard.promo {
        Some(applied) => match resolve_promo(repo, &applied.code, now)? {
            Some(discount) => Some((applied.code.clone(), discount)),
            None => {
                return Err(ServiceError::Form(format!(
                    "Promo code {} has expired.",
                    applied.code.as_str()
                )));
            }
        },
        None => None,
    };

    let subtotal: Money = lines.iter().map(|l| l.unit_price.times(l.quantity)).sum();
    let discount = promo
        .as_ref()
        .map(|(_, discount)| crate::domain::pricing::discount_for(subtotal, *discount))
        .unwrap_or_default();
    let new_quote = NewQuoteRequest {
        patient_id: local.id,
        clinic_id: wizard.clinic_id,
        promo_code: promo.map(|(code, _)| code),
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
        patient,
        lines,
    };

    let quote = repo.create_quote(&new_quote).map_err(|err| {
        log::error!("Failed to create quote for {}: {err}", user.email);
        ServiceError::from(err)
    })?;
    wizard.reset();

    let mut notify = admin_ids(repo);
    if let Some(clinic_id) = quote.clinic_id {
        notify.extend(clinic_staff_ids(repo, clinic_id));
    }
    publish_quietly(
        publisher,
        DentalEvent::QuoteUpdated {
            quote_id: quote.id.get(),
            status: quote.status.as_str().to_string(),
            notify,
        },
    );
    Ok(quote)
}
