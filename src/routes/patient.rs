//! Patient portal.

use std::path::Path;

use actix_files::NamedFile;
use actix_multipart::form::MultipartForm;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use chrono::Utc;
use tera::Tera;

use crate::domain::auth::AuthenticatedUser;
use crate::dto::ListQuery;
use crate::forms::bookings::AcceptPlanForm;
use crate::forms::documents::UploadDocumentForm;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::bookings::booking_page;
use crate::routes::{
    action_error, base_context, insert_unread_counts, page_error, redirect, render_template,
};
use crate::services::events::EventPublisher;
use crate::services::{
    bookings as bookings_service, dental_chart as chart_service, documents as documents_service,
    plans as plans_service, quotes as quotes_service,
};

#[get("/patient")]
pub async fn show_dashboard(
    params: web::Query<ListQuery>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let query = params.into_inner();
    let quotes = match quotes_service::list_patient_quotes(repo.get_ref(), &user, query) {
        Ok(quotes) => quotes,
        Err(err) => return page_error(err, "list quotes"),
    };
    let bookings =
        match bookings_service::list_patient_bookings(repo.get_ref(), &user, ListQuery::default()) {
            Ok(bookings) => bookings,
            Err(err) => return page_error(err, "list bookings"),
        };

    let mut context = base_context(
        &flash_messages,
        &user,
        "patient",
        &server_config.auth_service_url,
    );
    insert_unread_counts(&mut context, repo.get_ref(), &user);
    context.insert("quotes", &quotes.quotes);
    context.insert("status_filter", &quotes.status_filter);
    context.insert("bookings", &bookings.bookings);
    render_template(&tera, "patient/index.html", &context)
}

#[get("/patient/quote/{quote_id}")]
pub async fn show_quote(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quotes_service::load_patient_quote(repo.get_ref(), &user, quote_id.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "patient",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("quote", &data.quote);
            context.insert("clinic", &data.clinic);
            context.insert("plans", &data.plans);
            context.insert("uk_total", &data.uk_total);
            context.insert("savings_percent", &data.savings_percent);
            render_template(&tera, "patient/quote.html", &context)
        }
        Err(err) => page_error(err, "load the quote"),
    }
}

#[post("/patient/quote/{quote_id}/cancel")]
pub async fn cancel_quote(
    quote_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
) -> impl Responder {
    let quote_id = quote_id.into_inner();
    let back = format!("/patient/quote/{quote_id}");
    match quotes_service::cancel_quote(repo.get_ref(), publisher.get_ref(), &user, quote_id) {
        Ok(_) => {
            FlashMessage::success("Quote cancelled.").send();
            redirect(&back)
        }
        Err(err) => action_error(err, &back, "cancel the quote"),
    }
}

#[post("/patient/plan/{plan_id}/accept")]
pub async fn accept_plan(
    plan_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
    web::Form(form): web::Form<AcceptPlanForm>,
) -> impl Responder {
    let today = Utc::now().date_naive();
    match quotes_service::accept_plan(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        plan_id.into_inner(),
        form,
        today,
    ) {
        Ok(booking) => {
            FlashMessage::success(format!(
                "Treatment plan accepted. Your booking reference is {}.",
                booking.reference
            ))
            .send();
            redirect(&format!("/patient/booking/{}", booking.id.get()))
        }
        Err(err) => action_error(err, "/patient", "accept the treatment plan"),
    }
}

#[post("/patient/plan/{plan_id}/reject")]
pub async fn reject_plan(
    plan_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    publisher: web::Data<dyn EventPublisher>,
) -> impl Responder {
    match plans_service::reject_plan(
        repo.get_ref(),
        publisher.get_ref(),
        &user,
        plan_id.into_inner(),
    ) {
        Ok(plan) => {
            FlashMessage::info("The clinic has been asked for a revised plan.").send();
            redirect(&format!("/patient/quote/{}", plan.quote_id.get()))
        }
        Err(err) => action_error(err, "/patient", "reject the treatment plan"),
    }
}

#[get("/patient/booking/{booking_id}")]
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

#[get("/patient/documents")]
pub async fn show_documents(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match documents_service::list_documents(repo.get_ref(), &user, None) {
        Ok(documents) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "documents",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("documents", &documents);
            context.insert("max_upload_mb", &server_config.max_upload_mb);
            render_template(&tera, "patient/documents.html", &context)
        }
        Err(err) => page_error(err, "list documents"),
    }
}

#[post("/patient/documents/upload")]
pub async fn upload_document(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
    MultipartForm(form): MultipartForm<UploadDocumentForm>,
) -> impl Responder {
    let uploads_dir = Path::new(&server_config.uploads_dir);
    match documents_service::upload_document(
        repo.get_ref(),
        &user,
        uploads_dir,
        server_config.max_upload_bytes(),
        form.incoming(),
    ) {
        Ok(document) => {
            FlashMessage::success(format!("{} uploaded.", document.file_name)).send();
            redirect("/patient/documents")
        }
        Err(err) => action_error(err, "/patient/documents", "upload the document"),
    }
}

#[post("/patient/documents/{document_id}/delete")]
pub async fn delete_document(
    document_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
) -> impl Responder {
    let uploads_dir = Path::new(&server_config.uploads_dir);
    match documents_service::delete_document(
        repo.get_ref(),
        &user,
        uploads_dir,
        document_id.into_inner(),
    ) {
        Ok(()) => {
            FlashMessage::success("Document deleted.").send();
            redirect("/patient/documents")
        }
        Err(err) => action_error(err, "/patient/documents", "delete the document"),
    }
}

/// Download shared by patients and the staff of their clinics.
#[get("/documents/{document_id}/download")]
pub async fn download_document(
    req: HttpRequest,
    document_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
) -> HttpResponse {
    let uploads_dir = Path::new(&server_config.uploads_dir);
    let (document, path) = match documents_service::document_for_download(
        repo.get_ref(),
        &user,
        uploads_dir,
        document_id.into_inner(),
    ) {
        Ok(found) => found,
        Err(err) => return page_error(err, "load the document"),
    };
    match NamedFile::open(&path) {
        Ok(file) => file
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(document.file_name)],
            })
            .into_response(&req),
        Err(err) => {
            log::error!("Stored file {} is missing: {err}", path.display());
            HttpResponse::NotFound().finish()
        }
    }
}

#[get("/patient/chart")]
pub async fn show_chart(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match chart_service::load_chart(repo.get_ref(), &user, None) {
        Ok(chart) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "chart",
                &server_config.auth_service_url,
            );
            insert_unread_counts(&mut context, repo.get_ref(), &user);
            context.insert("chart", &chart);
            context.insert("editable", &true);
            render_template(&tera, "patient/chart.html", &context)
        }
        Err(err) => page_error(err, "load the dental chart"),
    }
}
