//! Admin portal.

use actix_multipart::form::MultipartForm;
use actix_web::{Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use serde::Deserialize;
use tera::Tera;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser};
use crate::dto::ListQuery;
use crate::forms::ActiveForm;
use crate::forms::admin::{AssignClinicForm, ClinicForm, HotelForm, StaffForm, StatusFilterQuery};
use crate::forms::bookings::{HotelStayStatusForm, PaymentStatusForm};
use crate::forms::catalog::{TreatmentForm, UploadTreatmentsForm};
use crate::forms::offers::ModerateOfferForm;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::bookings::booking_page;
use crate::routes::{
    action_error, base_context, insert_unread_counts, page_error, redirect, render_template,
};
use crate::services::ensure_role;
use crate::services::events::EventPublisher;
use crate::services::{
    admin as admin_service, bookings as bookings_service, catalog as catalog_service,
    offers as offers_service, quotes as quotes_service,
};

#[get("/admin")]
pub async fn show_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let stats = match admin_service::dashboard(repo.get_ref(), &user) {
        Ok(stats) => stats,
        Err(err) => return page_error(err, "load the dashboard"),
    };
    let pending = ListQuery {
        status: Some("pending".to_string()),
        ..ListQuery::default()
    };
    let quotes = match quotes_service::list_all_quotes(repo.get_ref(), &user, pending) {
        Ok(quotes) => quotes,
        Err(err) => return page_error(err, "list pending quotes"),
    };

    let mut context = base_context(
        &flash_messages,
        &user,
        "admin",
        &server_config.auth_service_url,
    );
    insert_unread_counts(&mut context, repo.get_ref(), &user);
    context.insert("stats", &stats);
    context.insert("quotes", &quotes.quotes);
    render_template(&tera, "admin/index.html", &context)
}

#[get("/admin/quotes")]
pub async fn show_quotes(
    params: web::Query<ListQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quotes_service::list_all_quotes(repo.get_ref(), &user, params.into_inner()) {
        Ok(page) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "quotes",
                &server_config.auth_service_url,
            );
            context.insert("quotes", &page.quotes);
            context.insert("status_filter", &page.status_filter);
            render_template(&tera, "admin/quotes.html", &context)
        }
        Err(err) => page_error(err, "list quotes"),
    }
}

#[get("/admin/quote/{quote_id}")]
pub async fn show_quote(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let data = match quotes_service::load_admin_quote(repo.get_ref(), &user, quote_id.into_inner())
    {
        Ok(data) => data,
        Err(err) => return page_error(err, "load the quote"),
    };
    let clinics = match admin_service::list_clinics(repo.get_ref(), &user, ListQuery::default()) {
        Ok(clinics) => clinics,
        Err(err) => return page_error(err, "list clinics"),
    };

    let mut context = base_context(
        &flash_messages,
        &user,
        "quotes",
        &server_config.auth_service_url,
    );
    context.insert("quote", &data.quote);
    context.insert("clinic", &data.clinic);
    context.insert("plans", &data.plans);
    context.insert("uk_total", &data.uk_total);
    context.insert("savings_percent", &data.savings_percent);
    context.insert("clinics", &clinics.items);
    render_template(&tera, "admin/quote.html", &context)
}

#[post("/admin/quote/{quote_id}/assign")]
pub async fn assign_quote(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<AssignClinicForm>,
) -> impl Responder {
    let quote_id = quote_id.into_inner();
    let back = format!("/admin/quote/{quote_id}");
    match quotes_service::assign_quote(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        quote_id,
        form.clinic_id,
    ) {
        Ok(_) => {
            FlashMessage::success("Quote assigned to the clinic.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "assign the quote"),
    }
}

#[get("/admin/bookings")]
pub async fn show_bookings(
    params: web::Query<ListQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match bookings_service::list_all_bookings(repo.get_ref(), &user, params.into_inner()) {
        Ok(page) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "bookings",
                &server_config.auth_service_url,
            );
            context.insert("bookings", &page.bookings);
            context.insert("status_filter", &page.status_filter);
            let statuses: Vec<&str> = bookings_service::ALL_STATUSES
                .iter()
                .map(|status| status.as_str())
                .collect();
            context.insert("statuses", &statuses);
            render_template(&tera, "admin/bookings.html", &context)
        }
        Err(err) => page_error(err, "list bookings"),
    }
}

#[get("/admin/booking/{booking_id}")]
pub async fn show_booking(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    booking_page(
        booking_id.into_inner(),
        &user,
        repo.get_ref(),
        &flash_messages,
        server_config.get_ref(),
        tera.get_ref(),
    )
}

#[get("/admin/clinics")]
pub async fn show_clinics(
    params: web::Query<ListQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let query = params.into_inner();
    let search = query.search.clone();
    match admin_service::list_clinics(repo.get_ref(), &user, query) {
        Ok(clinics) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "clinics",
                &server_config.auth_service_url,
            );
            context.insert("clinics", &clinics);
            context.insert("search", &search);
            render_template(&tera, "admin/clinics.html", &context)
        }
        Err(err) => page_error(err, "list clinics"),
    }
}

#[post("/admin/clinics")]
pub async fn create_clinic(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ClinicForm>,
) -> impl Responder {
    match admin_service::create_clinic(repo.get_ref(), &user, form) {
        Ok(clinic) => {
            FlashMessage::success(format!("Clinic {} created.", clinic.name)).send();
            redirect("/admin/clinics")
        }
        Err(err) => action_error(err, "/admin/clinics", "create the clinic"),
    }
}

#[post("/admin/clinics/{clinic_id}")]
pub async fn update_clinic(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ClinicForm>,
) -> impl Responder {
    match admin_service::update_clinic(repo.get_ref(), &user, clinic_id.into_inner(), form) {
        Ok(clinic) => {
            FlashMessage::success(format!("Clinic {} saved.", clinic.name)).send();
            redirect("/admin/clinics")
        }
        Err(err) => action_error(err, "/admin/clinics", "save the clinic"),
    }
}

#[get("/admin/clinics/{clinic_id}/staff")]
pub async fn show_staff(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match admin_service::clinic_staff(repo.get_ref(), &user, clinic_id.into_inner()) {
        Ok((clinic, staff, candidates)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "clinics",
                &server_config.auth_service_url,
            );
            context.insert("clinic", &clinic);
            context.insert("staff", &staff);
            context.insert("candidates", &candidates);
            render_template(&tera, "admin/staff.html", &context)
        }
        Err(err) => page_error(err, "load clinic staff"),
    }
}

#[post("/admin/clinics/{clinic_id}/staff")]
pub async fn assign_staff(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<StaffForm>,
) -> impl Responder {
    let clinic_id = clinic_id.into_inner();
    let back = format!("/admin/clinics/{clinic_id}/staff");
    match admin_service::assign_staff(repo.get_ref(), &user, clinic_id, form) {
        Ok(()) => {
            FlashMessage::success("Staff member assigned.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "assign the staff member"),
    }
}

#[post("/admin/clinics/{clinic_id}/staff/remove")]
pub async fn remove_staff(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<StaffForm>,
) -> impl Responder {
    let clinic_id = clinic_id.into_inner();
    let back = format!("/admin/clinics/{clinic_id}/staff");
    match admin_service::remove_staff(repo.get_ref(), &user, clinic_id, form) {
        Ok(()) => {
            FlashMessage::success("Staff member removed.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "remove the staff member"),
    }
}

#[derive(Deserialize)]
struct CategoryQuery {
    category: Option<String>,
}

#[get("/admin/treatments")]
pub async fn show_treatments(
    params: web::Query<CategoryQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    if let Err(err) = ensure_role(&user, ADMIN_ROLE) {
        return page_error(err, "list treatments");
    }
    match catalog_service::load_catalog(repo.get_ref(), params.into_inner().category) {
        Ok(catalog) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "treatments",
                &server_config.auth_service_url,
            );
            context.insert("treatments", &catalog.treatments);
            context.insert("categories", &catalog.categories);
            context.insert("selected_category", &catalog.selected_category);
            render_template(&tera, "admin/treatments.html", &context)
        }
        Err(err) => page_error(err, "list treatments"),
    }
}

#[post("/admin/treatments")]
pub async fn create_treatment(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<TreatmentForm>,
) -> impl Responder {
    match catalog_service::create_treatment(repo.get_ref(), &user, form) {
        Ok(treatment) => {
            FlashMessage::success(format!("{} added to the catalog.", treatment.name)).send();
            redirect("/admin/treatments")
        }
        Err(err) => action_error(err, "/admin/treatments", "add the treatment"),
    }
}

#[post("/admin/treatment/{treatment_id}")]
pub async fn update_treatment(
    treatment_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<TreatmentForm>,
) -> impl Responder {
    match catalog_service::update_treatment(repo.get_ref(), &user, treatment_id.into_inner(), form)
    {
        Ok(treatment) => {
            FlashMessage::success(format!("{} saved.", treatment.name)).send();
            redirect("/admin/treatments")
        }
        Err(err) => action_error(err, "/admin/treatments", "save the treatment"),
    }
}

#[post("/admin/treatments/import")]
pub async fn import_treatments(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    MultipartForm(mut form): MultipartForm<UploadTreatmentsForm>,
) -> impl Responder {
    match catalog_service::import_treatments(repo.get_ref(), &user, &mut form) {
        Ok(count) => {
            FlashMessage::success(format!("{count} treatment(s) imported.")).send();
            redirect("/admin/treatments")
        }
        Err(err) => action_error(err, "/admin/treatments", "import treatments"),
    }
}

#[get("/admin/offers")]
pub async fn show_offers(
    params: web::Query<StatusFilterQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let status = params.into_inner().status;
    match offers_service::list_offers_for_moderation(repo.get_ref(), &user, status.clone()) {
        Ok(offers) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "offers",
                &server_config.auth_service_url,
            );
            context.insert("offers", &offers);
            context.insert("status_filter", &status);
            render_template(&tera, "admin/offers.html", &context)
        }
        Err(err) => page_error(err, "list offers"),
    }
}

#[post("/admin/offers/{offer_id}/moderate")]
pub async fn moderate_offer(
    offer_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<ModerateOfferForm>,
) -> impl Responder {
    match offers_service::moderate_offer(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        offer_id.into_inner(),
        form,
    ) {
        Ok(offer) => {
            FlashMessage::success(format!(
                "{} is now {}.",
                offer.title,
                offer.status.as_str()
            ))
            .send();
            redirect("/admin/offers")
        }
        Err(err) => action_error(err, "/admin/offers", "moderate the offer"),
    }
}

#[get("/admin/payments")]
pub async fn show_payments(
    params: web::Query<StatusFilterQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let status = params.into_inner().status;
    match bookings_service::list_payments(repo.get_ref(), &user, status.clone()) {
        Ok(payments) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "payments",
                &server_config.auth_service_url,
            );
            context.insert("payments", &payments);
            context.insert("status_filter", &status);
            render_template(&tera, "admin/payments.html", &context)
        }
        Err(err) => page_error(err, "list payments"),
    }
}

#[post("/admin/payments/{payment_id}/status")]
pub async fn update_payment(
    payment_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<PaymentStatusForm>,
) -> impl Responder {
    match bookings_service::update_payment_status(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        payment_id.into_inner(),
        form,
    ) {
        Ok(payment) => {
            FlashMessage::success(format!(
                "Payment #{} marked {}.",
                payment.id.get(),
                payment.status.as_str()
            ))
            .send();
            redirect("/admin/payments")
        }
        Err(err) => action_error(err, "/admin/payments", "update the payment"),
    }
}

#[get("/admin/hotels")]
pub async fn show_hotels(
    params: web::Query<StatusFilterQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let status = params.into_inner().status;
    let hotels = match admin_service::list_all_hotels(repo.get_ref(), &user) {
        Ok(hotels) => hotels,
        Err(err) => return page_error(err, "list hotels"),
    };
    let stays = match bookings_service::list_hotel_stays(repo.get_ref(), &user, status.clone()) {
        Ok(stays) => stays,
        Err(err) => return page_error(err, "list hotel stays"),
    };

    let mut context = base_context(
        &flash_messages,
        &user,
        "hotels",
        &server_config.auth_service_url,
    );
    context.insert("hotels", &hotels);
    context.insert("stays", &stays);
    context.insert("status_filter", &status);
    render_template(&tera, "admin/hotels.html", &context)
}

#[post("/admin/hotels")]
pub async fn create_hotel(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<HotelForm>,
) -> impl Responder {
    match admin_service::create_hotel(repo.get_ref(), &user, form) {
        Ok(hotel) => {
            FlashMessage::success(format!("{} added.", hotel.name)).send();
            redirect("/admin/hotels")
        }
        Err(err) => action_error(err, "/admin/hotels", "add the hotel"),
    }
}

#[post("/admin/hotels/{hotel_id}/active")]
pub async fn set_hotel_active(
    hotel_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ActiveForm>,
) -> impl Responder {
    match admin_service::set_hotel_active(repo.get_ref(), &user, hotel_id.into_inner(), form.active)
    {
        Ok(()) => redirect("/admin/hotels"),
        Err(err) => action_error(err, "/admin/hotels", "update the hotel"),
    }
}

#[post("/admin/hotel-stays/{stay_id}/status")]
pub async fn update_hotel_stay(
    stay_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<HotelStayStatusForm>,
) -> impl Responder {
    match bookings_service::update_hotel_stay(repo.get_ref(), &user, stay_id.into_inner(), form) {
        Ok(stay) => {
            FlashMessage::success(format!(
                "Hotel stay #{} is now {}.",
                stay.id.get(),
                stay.status.as_str()
            ))
            .send();
            redirect("/admin/hotels")
        }
        Err(err) => action_error(err, "/admin/hotels", "update the hotel stay"),
    }
}

#[derive(Deserialize)]
struct PortalQuery {
    portal: Option<String>,
}

#[get("/admin/users")]
pub async fn show_users(
    params: web::Query<PortalQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let portal = params.into_inner().portal;
    match admin_service::list_users(repo.get_ref(), &user, portal.clone()) {
        Ok(users) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "users",
                &server_config.auth_service_url,
            );
            context.insert("users", &users);
            context.insert("portal_filter", &portal);
            render_template(&tera, "admin/users.html", &context)
        }
        Err(err) => page_error(err, "list users"),
    }
}
