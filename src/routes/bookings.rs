//! Booking page and the actions every party to a booking can take.

use actix_web::{HttpResponse, Responder, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::auth::AuthenticatedUser;
use crate::forms::bookings::{BookingStatusForm, HotelStayForm, PaymentForm};
use crate::forms::messages::MessageForm;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{
    action_error, base_context, insert_unread_counts, page_error, portal_home, render_template,
    redirect,
};
use crate::services::bookings as bookings_service;
use crate::services::events::EventPublisher;
use crate::services::messages as messages_service;

fn booking_path(user: &AuthenticatedUser, booking_id: i32) -> String {
    format!("{}/booking/{booking_id}", portal_home(user))
}

/// Renders the booking detail shared by the three portals.
pub(crate) fn booking_page(
    booking_id: i32,
    user: &AuthenticatedUser,
    repo: &DieselRepository,
    flash_messages: &IncomingFlashMessages,
    server_config: &ServerConfig,
    tera: &Tera,
) -> HttpResponse {
    match bookings_service::load_booking(repo, user, booking_id) {
        Ok(data) => {
            let mut context = base_context(
                flash_messages,
                user,
                "bookings",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo, user);
            context.insert("booking", &data.booking);
            context.insert("clinic", &data.clinic);
            context.insert("plan", &data.plan);
            context.insert("appointments", &data.appointments);
            context.insert("payments", &data.payments);
            context.insert("hotel_stays", &data.hotel_stays);
            context.insert("hotels", &data.hotels);
            context.insert("messages", &data.messages);
            context.insert("balance_due", &data.balance_due);
            context.insert("viewer", &data.viewer);
            context.insert("next_statuses", &data.next_statuses);
            render_template(tera, "bookings/show.html", &context)
        }
        Err(err) => page_error(err, "load the booking"),
    }
}

#[post("/booking/{booking_id}/status")]
pub async fn change_status(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<BookingStatusForm>,
) -> impl Responder {
    let booking_id = booking_id.into_inner();
    let back = booking_path(&user, booking_id);
    match bookings_service::change_status(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        booking_id,
        form,
    ) {
        Ok(booking) => {
            FlashMessage::success(format!(
                "Booking {} is now {}.",
                booking.reference,
                booking.status.as_str().replace('_', " ")
            ))
            .send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "update the booking"),
    }
}

#[post("/booking/{booking_id}/messages")]
pub async fn post_message(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<MessageForm>,
) -> impl Responder {
    let booking_id = booking_id.into_inner();
    let back = format!("{}#messages", booking_path(&user, booking_id));
    match messages_service::post_message(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        booking_id,
        form,
    ) {
        Ok(_) => redirect(&back),
        Err(err) => action_error(err, &back, "send the message"),
    }
}

#[post("/booking/{booking_id}/payments")]
pub async fn record_payment(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PaymentForm>,
) -> impl Responder {
    let booking_id = booking_id.into_inner();
    let back = booking_path(&user, booking_id);
    match bookings_service::record_payment(repo.get_ref(), &user, booking_id, form) {
        Ok(payment) => {
            FlashMessage::success(format!(
                "Payment of {} recorded and awaiting confirmation.",
                payment.amount
            ))
            .send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "record the payment"),
    }
}

#[post("/booking/{booking_id}/hotel-stays")]
pub async fn request_hotel_stay(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<HotelStayForm>,
) -> impl Responder {
    let booking_id = booking_id.into_inner();
    let back = booking_path(&user, booking_id);
    match bookings_service::request_hotel_stay(repo.get_ref(), &user, booking_id, form) {
        Ok(_) => {
            FlashMessage::success("Hotel stay requested.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "request the hotel stay"),
    }
}
