//! Homepage, notifications and portal-neutral links.

use actix_identity::Identity;
use actix_web::{Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use chrono::Utc;
use serde::Deserialize;
use tera::{Context, Tera};

use crate::domain::auth::{AuthenticatedUser, Portal};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{
    action_error, alerts, base_context, insert_unread_counts, page_error, portal_home, redirect,
    render_template,
};
use crate::services::{catalog, notifications, offers};

#[get("/")]
pub async fn show_index(
    user: Option<AuthenticatedUser>,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let now = Utc::now().naive_utc();
    let offer_cards = match offers::homepage_offers(repo.get_ref(), now) {
        Ok(cards) => cards,
        Err(err) => return page_error(err, "load homepage offers"),
    };
    let packages = match catalog::list_public_packages(repo.get_ref()) {
        Ok(packages) => packages,
        Err(err) => return page_error(err, "load packages"),
    };

    let mut context = Context::new();
    context.insert("alerts", &alerts(&flash_messages));
    context.insert("current_page", "index");
    context.insert("home_url", &server_config.auth_service_url);
    if let Some(user) = &user {
        context.insert("current_user", user);
        context.insert("portal", &user.portal().map(Portal::as_str));
        context.insert("portal_home", portal_home(user));
    }
    context.insert("offers", &offer_cards);
    context.insert("packages", &packages);
    render_template(&tera, "main/index.html", &context)
}

#[get("/na")]
pub async fn not_assigned(
    user: Option<AuthenticatedUser>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let mut context = Context::new();
    context.insert("alerts", &alerts(&flash_messages));
    context.insert("current_page", "na");
    context.insert("home_url", &server_config.auth_service_url);
    if let Some(user) = &user {
        context.insert("current_user", user);
    }
    render_template(&tera, "main/not_assigned.html", &context)
}

#[post("/logout")]
pub async fn logout(identity: Identity) -> impl Responder {
    identity.logout();
    redirect("/")
}

fn portal_prefix(user: &AuthenticatedUser) -> Option<&'static str> {
    user.portal().map(|_| portal_home(user))
}

/// Notification links point here; the portal decides where it lands.
#[get("/booking/{booking_id}")]
pub async fn open_booking(booking_id: web::Path<i32>, user: AuthenticatedUser) -> impl Responder {
    match portal_prefix(&user) {
        Some(prefix) => redirect(&format!("{prefix}/booking/{}", booking_id.into_inner())),
        None => redirect(portal_home(&user)),
    }
}

#[get("/quote-request/{quote_id}")]
pub async fn open_quote(quote_id: web::Path<i32>, user: AuthenticatedUser) -> impl Responder {
    match portal_prefix(&user) {
        Some(prefix) => redirect(&format!("{prefix}/quote/{}", quote_id.into_inner())),
        None => redirect(portal_home(&user)),
    }
}

#[derive(Deserialize)]
struct NotificationsQuery {
    unread: Option<bool>,
}

#[get("/notifications")]
pub async fn show_notifications(
    params: web::Query<NotificationsQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let unread_only = params.unread.unwrap_or(false);
    match notifications::list_notifications(repo.get_ref(), &user, unread_only) {
        Ok(items) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "notifications",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("notifications", &items);
            context.insert("unread_only", &unread_only);
            render_template(&tera, "main/notifications.html", &context)
        }
        Err(err) => page_error(err, "list notifications"),
    }
}

/// Marks a notification read and follows its link.
#[post("/notifications/{notification_id}/read")]
pub async fn read_notification(
    notification_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<FollowForm>,
) -> impl Responder {
    match notifications::mark_read(repo.get_ref(), &user, notification_id.into_inner()) {
        Ok(()) => match form.link.as_deref().filter(|link| is_local_link(link)) {
            Some(link) => redirect(link),
            None => redirect("/notifications"),
        },
        Err(err) => action_error(err, "/notifications", "mark the notification read"),
    }
}

#[derive(Deserialize)]
pub struct FollowForm {
    link: Option<String>,
}

/// Only same-site paths may be followed after marking a notification read.
fn is_local_link(link: &str) -> bool {
    link.starts_with('/') && !link.starts_with("//")
}

#[post("/notifications/read-all")]
pub async fn read_all_notifications(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match notifications::mark_all_read(repo.get_ref(), &user) {
        Ok(count) => {
            FlashMessage::success(format!("{count} notification(s) marked as read.")).send();
            redirect("/notifications")
        }
        Err(err) => action_error(err, "/notifications", "mark notifications read"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_links_are_followed() {
        assert!(is_local_link("/booking/4"));
        assert!(!is_local_link("//evil.example/x"));
        assert!(!is_local_link("https://evil.example"));
    }
}
