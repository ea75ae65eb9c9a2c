//! JSON endpoints under `/api`.
//!
//! Errors are returned as `{"error": ...}` bodies, never as redirects.

use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, Responder, delete, get, post, put, routes, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::auth::{AuthenticatedUser, Portal};
use crate::domain::message::Message;
use crate::dto::bookings::BookingViewer;
use crate::forms::dental_chart::DentalChartPayload;
use crate::forms::plans::PlanLineForm;
use crate::repository::DieselRepository;
use crate::routes::json_error;
use crate::routes::quote::load_wizard;
use crate::services::{
    bookings as bookings_service, catalog as catalog_service, dental_chart as chart_service, messages as messages_service,
    notifications as notifications_service, offers as offers_service, plans as plans_service,
    wizard as wizard_service,
};

#[get("/special-offers/homepage")]
pub async fn homepage_offers(repo: web::Data<DieselRepository>) -> impl Responder {
    match offers_service::homepage_offers(repo.get_ref(), Utc::now().naive_utc()) {
        Ok(cards) => HttpResponse::Ok().json(cards),
        Err(err) => json_error(err),
    }
}

#[get("/clinics/{clinic_id}")]
pub async fn clinic_detail(
    clinic_id: web::Path<i32>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match catalog_service::clinic_detail(repo.get_ref(), clinic_id.into_inner()) {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(err) => json_error(err),
    }
}

#[derive(Deserialize)]
struct CompareQuery {
    #[serde(default)]
    treatment: Vec<String>,
}

/// `?treatment=12:2&treatment=31` prices the basket at every verified clinic.
#[get("/v1/clinics/compare")]
pub async fn compare_clinics(req: HttpRequest, repo: web::Data<DieselRepository>) -> impl Responder {
    let query: CompareQuery = match serde_html_form::from_str(req.query_string()) {
        Ok(query) => query,
        Err(err) => {
            log::warn!("Malformed comparison query: {err}");
            return HttpResponse::BadRequest().json(json!({ "error": "malformed query" }));
        }
    };
    let result = catalog_service::parse_basket(&query.treatment)
        .and_then(|basket| catalog_service::compare_clinics(repo.get_ref(), &basket));
    match result {
        Ok(comparisons) => HttpResponse::Ok().json(comparisons),
        Err(err) => json_error(err),
    }
}

#[derive(Deserialize)]
struct HotelQuery {
    city: Option<String>,
}

#[get("/v1/hotels")]
pub async fn list_hotels(
    query: web::Query<HotelQuery>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match bookings_service::list_hotels(repo.get_ref(), query.into_inner().city) {
        Ok(hotels) => HttpResponse::Ok().json(hotels),
        Err(err) => json_error(err),
    }
}

#[routes]
#[get("/get-dental-chart")]
#[get("/v1/dental-chart")]
pub async fn get_dental_chart(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match chart_service::load_chart(repo.get_ref(), &user, None) {
        Ok(chart) => HttpResponse::Ok().json(chart),
        Err(err) => json_error(err),
    }
}

#[routes]
#[post("/get-dental-chart")]
#[post("/v1/dental-chart")]
pub async fn save_dental_chart(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    payload: web::Json<DentalChartPayload>,
) -> impl Responder {
    match chart_service::save_chart(repo.get_ref(), &user, payload.into_inner()) {
        Ok(chart) => HttpResponse::Ok().json(chart),
        Err(err) => json_error(err),
    }
}

#[put("/v1/treatment-lines/{line_id}")]
pub async fn update_treatment_line(
    line_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    form: web::Json<PlanLineForm>,
) -> impl Responder {
    match plans_service::update_line(repo.get_ref(), &user, line_id.into_inner(), form.into_inner())
    {
        Ok(line) => HttpResponse::Ok().json(line),
        Err(err) => json_error(err),
    }
}

#[delete("/v1/treatment-lines/{line_id}")]
pub async fn delete_treatment_line(
    line_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match plans_service::delete_line(repo.get_ref(), &user, line_id.into_inner()) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => json_error(err),
    }
}

/// Totals of the wizard held in the caller's session.
#[get("/v1/quote/summary")]
pub async fn quote_summary(
    session: Session,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    HttpResponse::Ok().json(wizard_service::summarize(&load_wizard(&session, repo.get_ref())))
}

#[derive(Serialize)]
struct Me<'a> {
    #[serde(flatten)]
    user: &'a AuthenticatedUser,
    portal: Option<Portal>,
}

#[get("/auth/me")]
pub async fn me(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(Me {
        portal: user.portal(),
        user: &user,
    })
}

#[get("/v1/notifications/unread")]
pub async fn unread_counts(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match notifications_service::unread_counts(repo.get_ref(), &user) {
        Ok(counts) => HttpResponse::Ok().json(counts),
        Err(err) => json_error(err),
    }
}

#[derive(Serialize)]
struct Thread {
    reference: String,
    viewer: BookingViewer,
    messages: Vec<Message>,
}

#[get("/v1/bookings/{booking_id}/messages")]
pub async fn booking_messages(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match messages_service::load_thread(repo.get_ref(), &user, booking_id.into_inner()) {
        Ok((booking, viewer, messages)) => HttpResponse::Ok().json(Thread {
            reference: booking.reference,
            viewer,
            messages,
        }),
        Err(err) => json_error(err),
    }
}
