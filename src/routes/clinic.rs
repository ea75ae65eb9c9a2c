//! Clinic portal: assigned quotes, plan editor, bookings, offers and prices.

use actix_web::{Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use serde::Deserialize;
use tera::Tera;

use crate::domain::auth::AuthenticatedUser;
use crate::dto::ListQuery;
use crate::forms::ActiveForm;
use crate::forms::bookings::AppointmentForm;
use crate::forms::catalog::{ClinicPriceForm, PackageForm};
use crate::forms::offers::OfferForm;
use crate::forms::plans::{CreatePlanForm, PlanLineForm};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::bookings::booking_page;
use crate::routes::{
    action_error, base_context, insert_unread_counts, page_error, redirect, render_template,
};
use crate::services::events::EventPublisher;
use crate::services::{
    ServiceError, bookings as bookings_service, catalog as catalog_service,
    dental_chart as chart_service, documents as documents_service, offers as offers_service,
    plans as plans_service, quotes as quotes_service,
};

/// Clinic selector carried by staff who work at several clinics.
#[derive(Debug, Default, Deserialize)]
pub struct ClinicQuery {
    pub clinic: Option<i32>,
}

fn with_clinic(path: &str, clinic: Option<i32>) -> String {
    match clinic {
        Some(id) => format!("{path}?clinic={id}"),
        None => path.to_string(),
    }
}

/// Repeated inputs (`treatment_id=1&treatment_id=2`) need `serde_html_form`.
fn parse_repeated<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ServiceError> {
    serde_html_form::from_bytes(body).map_err(|err| {
        log::error!("Failed to parse form body: {err}");
        ServiceError::Form("The submitted form could not be read.".to_string())
    })
}

#[get("/clinic")]
pub async fn show_dashboard(
    params: web::Query<ListQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let query = params.into_inner();
    let bookings_query = ListQuery {
        clinic: query.clinic,
        ..ListQuery::default()
    };
    let (clinic, clinics, quotes) =
        match quotes_service::list_clinic_quotes(repo.get_ref(), &user, query) {
            Ok(found) => found,
            Err(err) => return page_error(err, "list clinic quotes"),
        };
    let bookings =
        match bookings_service::list_clinic_bookings(repo.get_ref(), &user, bookings_query) {
            Ok((_, _, bookings)) => bookings,
            Err(err) => return page_error(err, "list clinic bookings"),
        };

    let mut context = base_context(
        &flash_messages,
        &user,
        "clinic",
        &server_config.auth_service_url,
    );
    insert_unread_counts(&mut context, repo.get_ref(), &user);
    context.insert("clinic", &clinic);
    context.insert("clinics", &clinics);
    context.insert("quotes", &quotes.quotes);
    context.insert("status_filter", &quotes.status_filter);
    context.insert("bookings", &bookings.bookings);
    render_template(&tera, "clinic/index.html", &context)
}

#[get("/clinic/quote/{quote_id}")]
pub async fn show_quote(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quotes_service::load_clinic_quote(repo.get_ref(), &user, quote_id.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "clinic",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("quote", &data.quote);
            context.insert("clinic", &data.clinic);
            context.insert("plans", &data.plans);
            context.insert("uk_total", &data.uk_total);
            context.insert("savings_percent", &data.savings_percent);
            context.insert("price_list", &data.price_list);
            render_template(&tera, "clinic/quote.html", &context)
        }
        Err(err) => page_error(err, "load the quote"),
    }
}

#[post("/clinic/plans")]
pub async fn create_plan(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    body: web::Bytes,
) -> impl Responder {
    let result = parse_repeated::<CreatePlanForm>(&body)
        .and_then(|form| plans_service::create_plan(repo.get_ref(), &user, form));
    match result {
        Ok(plan) => {
            FlashMessage::success(format!("Draft plan v{} created.", plan.version)).send();
            redirect(&format!("/clinic/plan/{}", plan.id.get()))
        }
        Err(err) => action_error(err, "/clinic", "create the treatment plan"),
    }
}

#[get("/clinic/plan/{plan_id}")]
pub async fn show_plan(
    plan_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let plan = match plans_service::load_editable_plan(repo.get_ref(), &user, plan_id.into_inner())
    {
        Ok(plan) => plan,
        Err(err) => return page_error(err, "load the treatment plan"),
    };
    let detail = match catalog_service::clinic_detail(repo.get_ref(), plan.clinic_id.get()) {
        Ok(detail) => detail,
        Err(err) => return page_error(err, "load the clinic price list"),
    };

    let mut context = base_context(
        &flash_messages,
        &user,
        "clinic",
        &server_config.auth_service_url,
    );
    insert_unread_counts(&mut context, repo.get_ref(), &user);
    context.insert("plan_total", &plan.total());
    context.insert("plan", &plan);
    context.insert("clinic", &detail.clinic);
    context.insert("price_list", &detail.treatments);
    render_template(&tera, "clinic/plan.html", &context)
}

#[post("/clinic/plan/{plan_id}/lines")]
pub async fn add_plan_line(
    plan_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PlanLineForm>,
) -> impl Responder {
    let plan_id = plan_id.into_inner();
    let back = format!("/clinic/plan/{plan_id}");
    match plans_service::add_line(repo.get_ref(), &user, plan_id, form) {
        Ok(_) => redirect(&back),
        Err(err) => action_error(err, &back, "add the plan line"),
    }
}

#[post("/clinic/plan-line/{line_id}")]
pub async fn update_plan_line(
    line_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PlanLineForm>,
) -> impl Responder {
    match plans_service::update_line(repo.get_ref(), &user, line_id.into_inner(), form) {
        Ok(line) => redirect(&format!("/clinic/plan/{}", line.plan_id.get())),
        Err(err) => action_error(err, "/clinic", "update the plan line"),
    }
}

#[derive(Deserialize)]
pub struct PlanRefForm {
    plan_id: i32,
}

#[post("/clinic/plan-line/{line_id}/delete")]
pub async fn delete_plan_line(
    line_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PlanRefForm>,
) -> impl Responder {
    let back = format!("/clinic/plan/{}", form.plan_id);
    match plans_service::delete_line(repo.get_ref(), &user, line_id.into_inner()) {
        Ok(()) => redirect(&back),
        Err(err) => action_error(err, &back, "delete the plan line"),
    }
}

#[post("/clinic/plan/{plan_id}/send")]
pub async fn send_plan(
    plan_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
) -> impl Responder {
    let plan_id = plan_id.into_inner();
    let back = format!("/clinic/plan/{plan_id}");
    match plans_service::send_plan(repo.get_ref(), publisher.get_ref(), &user, plan_id) {
        Ok(plan) => {
            FlashMessage::success("Treatment plan sent to the patient.").send();
            redirect(&format!("/clinic/quote/{}", plan.quote_id.get()))
        }
        Err(err) => action_error(err, &back, "send the treatment plan"),
    }
}

#[get("/clinic/booking/{booking_id}")]
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

#[post("/clinic/booking/{booking_id}/appointments")]
pub async fn schedule_appointment(
    booking_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<AppointmentForm>,
) -> impl Responder {
    let booking_id = booking_id.into_inner();
    let back = format!("/clinic/booking/{booking_id}");
    match bookings_service::schedule_appointment(repo.get_ref(), &user, booking_id, form) {
        Ok(appointment) => {
            FlashMessage::success(format!(
                "{} scheduled for {}.",
                appointment.title,
                appointment.starts_at.format("%-d %b %Y %H:%M")
            ))
            .send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "schedule the appointment"),
    }
}

#[post("/clinic/booking/{booking_id}/appointments/{appointment_id}/cancel")]
pub async fn cancel_appointment(
    path: web::Path<(i32, i32)>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    let (booking_id, appointment_id) = path.into_inner();
    let back = format!("/clinic/booking/{booking_id}");
    match bookings_service::cancel_appointment(repo.get_ref(), &user, booking_id, appointment_id)
    {
        Ok(()) => {
            FlashMessage::success("Appointment cancelled.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "cancel the appointment"),
    }
}

/// Documents and dental chart of a patient treated by the clinic.
#[get("/clinic/patient/{patient_id}")]
pub async fn show_patient_record(
    patient_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let patient_id = patient_id.into_inner();
    let documents =
        match documents_service::list_documents(repo.get_ref(), &user, Some(patient_id)) {
            Ok(documents) => documents,
            Err(err) => return page_error(err, "list patient documents"),
        };
    let chart = match chart_service::load_chart(repo.get_ref(), &user, Some(patient_id)) {
        Ok(chart) => chart,
        Err(err) => return page_error(err, "load the dental chart"),
    };

    let mut context = base_context(
        &flash_messages,
        &user,
        "clinic",
        &server_config.auth_service_url,
    );
    insert_unread_counts(&mut context, repo.get_ref(), &user);
    context.insert("patient_id", &patient_id);
    context.insert("documents", &documents);
    context.insert("chart", &chart);
    context.insert("editable", &false);
    render_template(&tera, "clinic/patient.html", &context)
}

#[get("/clinic/offers")]
pub async fn show_offers(
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match offers_service::list_clinic_offers(repo.get_ref(), &user, params.clinic) {
        Ok((clinic, clinics, offers)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "offers",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("clinic", &clinic);
            context.insert("clinics", &clinics);
            context.insert("offers", &offers);
            render_template(&tera, "clinic/offers.html", &context)
        }
        Err(err) => page_error(err, "list special offers"),
    }
}

#[post("/clinic/offers")]
pub async fn submit_offer(
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<OfferForm>,
) -> impl Responder {
    let back = with_clinic("/clinic/offers", params.clinic);
    match offers_service::submit_offer(repo.get_ref(), &user, params.clinic, form) {
        Ok(_) => {
            FlashMessage::success("Offer submitted for approval.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "submit the offer"),
    }
}

#[post("/clinic/offers/{offer_id}")]
pub async fn edit_offer(
    offer_id: web::Path<i32>,
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<OfferForm>,
) -> impl Responder {
    let back = with_clinic("/clinic/offers", params.clinic);
    match offers_service::edit_offer(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        offer_id.into_inner(),
        form,
    ) {
        Ok(offer) => {
            FlashMessage::success(format!(
                "Offer saved. It is now {}.",
                offer.status.as_str()
            ))
            .send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "save the offer"),
    }
}

#[post("/clinic/offers/{offer_id}/delete")]
pub async fn delete_offer(
    offer_id: web::Path<i32>,
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
) -> impl Responder {
    let back = with_clinic("/clinic/offers", params.clinic);
    match offers_service::delete_offer(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        offer_id.into_inner(),
    ) {
        Ok(()) => {
            FlashMessage::success("Offer deleted.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "delete the offer"),
    }
}

#[get("/clinic/catalog")]
pub async fn show_catalog(
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match catalog_service::clinic_catalog(repo.get_ref(), &user, params.clinic) {
        Ok(page) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "catalog",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("clinic", &page.clinic);
            context.insert("clinics", &page.clinics);
            context.insert("prices", &page.prices);
            context.insert("packages", &page.packages);
            render_template(&tera, "clinic/catalog.html", &context)
        }
        Err(err) => page_error(err, "load the clinic catalog"),
    }
}

#[post("/clinic/{clinic_id}/prices")]
pub async fn set_price(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ClinicPriceForm>,
) -> impl Responder {
    let clinic_id = clinic_id.into_inner();
    let back = with_clinic("/clinic/catalog", Some(clinic_id));
    match catalog_service::set_clinic_price(repo.get_ref(), &user, clinic_id, form) {
        Ok(()) => {
            FlashMessage::success("Price updated.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "update the price"),
    }
}

#[post("/clinic/{clinic_id}/packages")]
pub async fn create_package(
    clinic_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    body: web::Bytes,
) -> impl Responder {
    let clinic_id = clinic_id.into_inner();
    let back = with_clinic("/clinic/catalog", Some(clinic_id));
    let result = parse_repeated::<PackageForm>(&body)
        .and_then(|form| catalog_service::create_package(repo.get_ref(), &user, clinic_id, form));
    match result {
        Ok(package) => {
            FlashMessage::success(format!("Package {} created.", package.name)).send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "create the package"),
    }
}

#[post("/clinic/packages/{package_id}")]
pub async fn update_package(
    package_id: web::Path<i32>,
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    body: web::Bytes,
) -> impl Responder {
    let back = with_clinic("/clinic/catalog", params.clinic);
    let result = parse_repeated::<PackageForm>(&body).and_then(|form| {
        catalog_service::update_package(repo.get_ref(), &user, package_id.into_inner(), form)
    });
    match result {
        Ok(_) => {
            FlashMessage::success("Package saved.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "save the package"),
    }
}

#[post("/clinic/packages/{package_id}/active")]
pub async fn set_package_active(
    package_id: web::Path<i32>,
    params: web::Query<ClinicQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ActiveForm>,
) -> impl Responder {
    let back = with_clinic("/clinic/catalog", params.clinic);
    match catalog_service::set_package_active(
        repo.get_ref(),
        &user,
        package_id.into_inner(),
        form.active,
    ) {
        Ok(()) => redirect(&back),
        Err(err) => action_error(err, &back, "update the package"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_fields_are_collected() {
        let form: PackageForm = parse_repeated(
            b"name=Smile&price=1500&hotel_nights=3&treatment_id=1&quantity=8&treatment_id=2&quantity=1",
        )
        .unwrap();
        assert_eq!(form.treatment_id, vec![1, 2]);
        assert_eq!(form.quantity, vec![8, 1]);
    }

    #[test]
    fn clinic_selector_is_kept_in_redirects() {
        assert_eq!(with_clinic("/clinic/offers", Some(3)), "/clinic/offers?clinic=3");
        assert_eq!(with_clinic("/clinic/offers", None), "/clinic/offers");
    }
}
