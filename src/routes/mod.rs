//! HTTP handlers for the portals and the JSON API.

use actix_web::HttpResponse;
use actix_web::http::header;
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages, Level};
use serde_json::json;
use tera::{Context, Tera};

use crate::domain::auth::{AuthenticatedUser, Portal};
use crate::repository::DieselRepository;
use crate::services::{ServiceError, notifications};

pub mod admin;
pub mod api;
pub mod bookings;
pub mod clinic;
pub mod main;
pub mod patient;
pub mod quote;

pub const NOT_ASSIGNED_PATH: &str = "/na";

pub fn alert_level_to_str(level: &Level) -> &'static str {
    match level {
        Level::Error => "danger",
        Level::Warning => "warning",
        Level::Success => "success",
        _ => "info",
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn render_template(tera: &Tera, template: &str, context: &Context) -> HttpResponse {
    match tera.render(template, context) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("Failed to render template '{template}': {err:?}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Flash messages waiting to be shown as `(text, bootstrap level)` pairs.
pub fn alerts(flash_messages: &IncomingFlashMessages) -> Vec<(String, &'static str)> {
    flash_messages
        .iter()
        .map(|f| (f.content().to_string(), alert_level_to_str(&f.level())))
        .collect()
}

/// Context every portal page starts from.
pub fn base_context(
    flash_messages: &IncomingFlashMessages,
    user: &AuthenticatedUser,
    current_page: &str,
    home_url: &str,
) -> Context {
    let mut context = Context::new();
    context.insert("alerts", &alerts(flash_messages));
    context.insert("current_user", user);
    context.insert("portal", &user.portal().map(Portal::as_str));
    context.insert("current_page", current_page);
    context.insert("home_url", home_url);
    context
}

/// Adds the navigation badge counters; a failed lookup only hides the badges.
pub fn insert_unread_counts(context: &mut Context, repo: &DieselRepository, user: &AuthenticatedUser) {
    match notifications::unread_counts(repo, user) {
        Ok(counts) => context.insert("unread", &counts),
        Err(err) => log::warn!("Failed to count unread items for {}: {err}", user.email),
    }
}

/// Landing page of the portal a user belongs to.
pub fn portal_home(user: &AuthenticatedUser) -> &'static str {
    match user.portal() {
        Some(Portal::Admin) => "/admin",
        Some(Portal::Clinic) => "/clinic",
        Some(Portal::Patient) => "/patient",
        None => NOT_ASSIGNED_PATH,
    }
}

/// Response for a page that failed to load.
pub fn page_error(err: ServiceError, action: &str) -> HttpResponse {
    match err {
        ServiceError::Unauthorized => {
            FlashMessage::error("You do not have access to that page.").send();
            redirect(NOT_ASSIGNED_PATH)
        }
        ServiceError::NotFound => HttpResponse::NotFound().finish(),
        ServiceError::Form(message)
        | ServiceError::TypeConstraint(message)
        | ServiceError::Conflict(message) => {
            FlashMessage::error(message).send();
            redirect("/")
        }
        err => {
            log::error!("Failed to {action}: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Flash + redirect back to `back` for a form post that failed.
pub fn action_error(err: ServiceError, back: &str, action: &str) -> HttpResponse {
    match err {
        ServiceError::Unauthorized => {
            FlashMessage::error("You are not allowed to do that.").send();
            redirect(NOT_ASSIGNED_PATH)
        }
        ServiceError::NotFound => {
            FlashMessage::error("The requested record no longer exists.").send();
            redirect(back)
        }
        ServiceError::Form(message)
        | ServiceError::TypeConstraint(message)
        | ServiceError::Conflict(message) => {
            FlashMessage::error(message).send();
            redirect(back)
        }
        err => {
            log::error!("Failed to {action}: {err}");
            FlashMessage::error(format!("Could not {action}.")).send();
            redirect(back)
        }
    }
}

/// JSON body `{"error": ...}` with the status matching `err`.
pub fn json_error(err: ServiceError) -> HttpResponse {
    match err {
        ServiceError::Unauthorized => {
            HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }))
        }
        ServiceError::NotFound => HttpResponse::NotFound().json(json!({ "error": "not found" })),
        ServiceError::Form(message) | ServiceError::TypeConstraint(message) => {
            HttpResponse::BadRequest().json(json!({ "error": message }))
        }
        ServiceError::Conflict(message) => {
            HttpResponse::Conflict().json(json!({ "error": message }))
        }
        err => {
            log::error!("API request failed: {err}");
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}
