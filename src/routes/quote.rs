//! Quote wizard pages.
//!
//! The wizard lives server-side as a JSON draft; the session only carries the
//! draft token. Handlers restore it, apply one operation and write it back
//! only when the operation succeeded.

use actix_session::Session;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use chrono::Utc;
use serde::Deserialize;
use tera::{Context, Tera};
use uuid::Uuid;

use crate::domain::auth::{AuthenticatedUser, Portal};
use crate::domain::quote_wizard::QuoteWizard;
use crate::forms::quote::{
    AddTreatmentForm, ClinicChoiceForm, PackageChoiceForm, PatientInfoForm, PromoForm,
    RemoveTreatmentForm, SetQuantityForm, StepForm,
};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{action_error, alerts, page_error, redirect, render_template};
use crate::services::events::EventPublisher;
use crate::services::quote_document::build_quote_document;
use crate::services::wizard::{self as wizard_service, SESSION_KEY};
use crate::services::{ServiceError, ServiceResult};

const WIZARD_PATH: &str = "/quote";

fn draft_token(session: &Session) -> Option<String> {
    session.get::<String>(SESSION_KEY).unwrap_or_else(|err| {
        log::warn!("Unreadable quote draft token: {err}");
        None
    })
}

pub(crate) fn load_wizard(session: &Session, repo: &DieselRepository) -> QuoteWizard {
    wizard_service::load_draft(repo, draft_token(session).as_deref())
}

fn store_wizard(
    session: &Session,
    repo: &DieselRepository,
    wizard: &QuoteWizard,
) -> ServiceResult<()> {
    let token = match draft_token(session) {
        Some(token) => token,
        None => {
            let token = Uuid::new_v4().to_string();
            session
                .insert(SESSION_KEY, &token)
                .map_err(|err| ServiceError::Internal(format!("session write: {err}")))?;
            token
        }
    };
    wizard_service::save_draft(repo, &token, wizard, Utc::now().naive_utc())
}

/// Runs `operation` on the stored wizard and persists it only on success.
fn mutate_wizard<F>(
    session: &Session,
    repo: &DieselRepository,
    action: &str,
    success: Option<&str>,
    operation: F,
) -> HttpResponse
where
    F: FnOnce(&mut QuoteWizard) -> ServiceResult<()>,
{
    let mut wizard = load_wizard(session, repo);
    let result = operation(&mut wizard).and_then(|()| store_wizard(session, repo, &wizard));
    match result {
        Ok(()) => {
            if let Some(message) = success {
                FlashMessage::success(message).send();
            }
            redirect(WIZARD_PATH)
        }
        Err(err) => action_error(err, WIZARD_PATH, action),
    }
}

#[derive(Deserialize)]
struct WizardQuery {
    category: Option<String>,
}

#[get("/quote")]
pub async fn show_wizard(
    params: web::Query<WizardQuery>,
    user: Option<AuthenticatedUser>,
    session: Session,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let wizard = load_wizard(&session, repo.get_ref());
    let category = params.into_inner().category;
    match wizard_service::load_wizard_page(repo.get_ref(), &wizard, category.clone()) {
        Ok(page) => {
            let mut context = Context::new();
            context.insert("alerts", &alerts(&flash_messages));
            context.insert("current_page", "quote");
            context.insert("home_url", &server_config.auth_service_url);
            if let Some(user) = &user {
                context.insert("current_user", user);
                context.insert("portal", &user.portal().map(Portal::as_str));
            }
            context.insert("wizard", &page.summary);
            context.insert("treatments", &page.treatments);
            context.insert("categories", &page.categories);
            context.insert("selected_category", &category);
            context.insert("clinics", &page.clinics);
            context.insert("packages", &page.packages);
            render_template(&tera, "quote/wizard.html", &context)
        }
        Err(err) => page_error(err, "load the quote wizard"),
    }
}

#[post("/quote/treatments/add")]
pub async fn add_treatment(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<AddTreatmentForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "add the treatment", None, |wizard| {
        wizard_service::add_treatment(repo.get_ref(), wizard, form)
    })
}

#[post("/quote/treatments/quantity")]
pub async fn set_quantity(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<SetQuantityForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "change the quantity", None, |wizard| {
        wizard_service::set_quantity(wizard, form)
    })
}

#[post("/quote/treatments/remove")]
pub async fn remove_treatment(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<RemoveTreatmentForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "remove the treatment", None, |wizard| {
        wizard_service::remove_treatment(wizard, form.treatment_id)
    })
}

#[post("/quote/promo")]
pub async fn apply_promo(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PromoForm>,
) -> impl Responder {
    let now = Utc::now().naive_utc();
    mutate_wizard(
        &session,
        repo.get_ref(),
        "apply the promo code",
        Some("Promo code applied."),
        |wizard| wizard_service::apply_promo(repo.get_ref(), wizard, form, now).map(|_| ()),
    )
}

#[post("/quote/promo/clear")]
pub async fn clear_promo(session: Session, repo: web::Data<DieselRepository>) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "remove the promo code", None, |wizard| {
        wizard_service::clear_promo(wizard);
        Ok(())
    })
}

#[post("/quote/patient")]
pub async fn save_patient(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PatientInfoForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "save your details", None, |wizard| {
        wizard_service::save_patient_info(wizard, form)
    })
}

#[post("/quote/clinic")]
pub async fn select_clinic(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ClinicChoiceForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "select the clinic", None, |wizard| {
        wizard_service::select_clinic(repo.get_ref(), wizard, form.clinic_id)
    })
}

#[post("/quote/package")]
pub async fn choose_package(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PackageChoiceForm>,
) -> impl Responder {
    mutate_wizard(
        &session,
        repo.get_ref(),
        "start from the package",
        Some("Package added to your quote."),
        |wizard| wizard_service::choose_package(repo.get_ref(), wizard, form.package_id),
    )
}

#[post("/quote/step")]
pub async fn navigate(
    session: Session,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<StepForm>,
) -> impl Responder {
    mutate_wizard(&session, repo.get_ref(), "change the step", None, |wizard| {
        wizard_service::navigate(wizard, form.navigation()).map(|_| ())
    })
}

#[post("/quote/reset")]
pub async fn reset_wizard(session: Session, repo: web::Data<DieselRepository>) -> impl Responder {
    if let Some(token) = draft_token(&session) {
        wizard_service::discard_draft(repo.get_ref(), &token);
    }
    session.remove(SESSION_KEY);
    redirect(WIZARD_PATH)
}

#[post("/quote/submit")]
pub async fn submit_quote(
    user: AuthenticatedUser,
    session: Session,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
) -> impl Responder {
    let now = Utc::now().naive_utc();
    let mut wizard = load_wizard(&session, repo.get_ref());
    match wizard_service::submit(repo.get_ref(), publisher.get_ref(), &user, &mut wizard, now) {
        Ok(quote) => {
            if let Some(token) = draft_token(&session) {
                wizard_service::discard_draft(repo.get_ref(), &token);
            }
            session.remove(SESSION_KEY);
            FlashMessage::success(format!(
                "Quote #{} submitted. We will be in touch shortly.",
                quote.id.get()
            ))
            .send();
            redirect(&format!("/patient/quote/{}", quote.id.get()))
        }
        Err(err) => action_error(err, WIZARD_PATH, "submit the quote"),
    }
}

/// Printable quote, opened inline so the browser can print or save it.
#[get("/quote/{quote_id}/document")]
pub async fn quote_document(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    let today = Utc::now().date_naive();
    match build_quote_document(repo.get_ref(), &user, quote_id.into_inner(), today) {
        Ok(document) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", document.file_name),
            ))
            .body(document.html),
        Err(err) => page_error(err, "build the quote document"),
    }
}
