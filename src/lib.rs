#[cfg(feature = "server")]
use std::sync::Arc;

#[cfg(feature = "server")]
use actix_cors::Cors;
#[cfg(feature = "server")]
use actix_files::Files;
#[cfg(feature = "server")]
use actix_identity::IdentityMiddleware;
#[cfg(feature = "server")]
use actix_multipart::form::MultipartFormConfig;
#[cfg(feature = "server")]
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
#[cfg(feature = "server")]
use actix_web::cookie::Key;
#[cfg(feature = "server")]
use actix_web::{App, HttpServer, middleware as actix_middleware, web};
#[cfg(feature = "server")]
use actix_web_flash_messages::{FlashMessagesFramework, storage::CookieMessageStore};
#[cfg(feature = "server")]
use tera::Tera;

#[cfg(feature = "server")]
use crate::db::{establish_connection_pool, run_migrations};
#[cfg(feature = "server")]
use crate::middleware::RedirectUnauthorized;
#[cfg(feature = "server")]
use crate::models::config::ServerConfig;
#[cfg(feature = "server")]
use crate::repository::DieselRepository;
#[cfg(feature = "server")]
use crate::routes::{admin, api, bookings, clinic, main, patient, quote};
#[cfg(feature = "server")]
use crate::services::events::{EventPublisher, NoopPublisher, ZmqEventPublisher};
#[cfg(feature = "server")]
use crate::services::quote_document::money_filter;

#[cfg(feature = "server")]
pub mod auth;
pub mod db;
pub mod domain;
#[cfg(feature = "server")]
pub mod dto;
pub mod error_conversions;
#[cfg(feature = "server")]
pub mod forms;
#[cfg(feature = "server")]
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod repository;
#[cfg(feature = "server")]
pub mod routes;
pub mod schema;
#[cfg(feature = "server")]
pub mod services;

/// Publisher handed to handlers; falls back to dropping events when the socket cannot bind.
#[cfg(feature = "server")]
pub fn build_publisher(server_config: &ServerConfig) -> Arc<dyn EventPublisher> {
    match ZmqEventPublisher::bind(&server_config.zmq_events_pub) {
        Ok(publisher) => Arc::new(publisher),
        Err(err) => {
            log::error!(
                "Failed to bind event publisher on {}: {err}; events will be dropped",
                server_config.zmq_events_pub
            );
            Arc::new(NoopPublisher)
        }
    }
}

/// Loads the templates and registers the custom filters.
#[cfg(feature = "server")]
pub fn build_tera(templates_dir: &str) -> Result<Tera, tera::Error> {
    let mut tera = Tera::new(templates_dir)?;
    tera.register_filter("money", money_filter);
    Ok(tera)
}

/// Builds and runs the Actix-Web HTTP server using the provided configuration.
#[cfg(feature = "server")]
pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
    let pool = establish_connection_pool(&server_config.database_url).map_err(|e| {
        std::io::Error::other(format!("Failed to establish database connection: {e}"))
    })?;
    let applied = run_migrations(&pool)
        .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {e}")))?;
    if applied > 0 {
        log::info!("Applied {applied} pending migration(s)");
    }

    std::fs::create_dir_all(&server_config.uploads_dir)?;

    let repo = DieselRepository::new(pool);
    let publisher = web::Data::from(build_publisher(&server_config));

    // Keys and stores for identity, sessions, and flash messages.
    let secret_key = Key::from(server_config.secret.as_bytes());

    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    let tera = build_tera(&server_config.templates_dir)
        .map_err(|e| std::io::Error::other(format!("Template parsing error(s): {e}")))?;

    let upload_limit = server_config.max_upload_bytes();
    let bind_address = (server_config.address.clone(), server_config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(message_framework.clone())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(false) // set to true in prod
                    .cookie_domain(Some(format!(".{}", server_config.domain)))
                    .build(),
            )
            .wrap(actix_middleware::Compress::default())
            .wrap(actix_middleware::Logger::default())
            .service(Files::new("/assets", "./assets"))
            .service(main::not_assigned)
            .service(
                web::scope("/api")
                    .service(api::homepage_offers)
                    .service(api::compare_clinics)
                    .service(api::clinic_detail)
                    .service(api::list_hotels)
                    .service(api::get_dental_chart)
                    .service(api::save_dental_chart)
                    .service(api::update_treatment_line)
                    .service(api::delete_treatment_line)
                    .service(api::quote_summary)
                    .service(api::me)
                    .service(api::unread_counts)
                    .service(api::booking_messages),
            )
            .service(
                web::scope("")
                    .wrap(RedirectUnauthorized)
                    .service(main::show_index)
                    .service(main::logout)
                    .service(main::open_booking)
                    .service(main::open_quote)
                    .service(main::show_notifications)
                    .service(main::read_all_notifications)
                    .service(main::read_notification)
                    .service(quote::show_wizard)
                    .service(quote::add_treatment)
                    .service(quote::set_quantity)
                    .service(quote::remove_treatment)
                    .service(quote::apply_promo)
                    .service(quote::clear_promo)
                    .service(quote::save_patient)
                    .service(quote::select_clinic)
                    .service(quote::choose_package)
                    .service(quote::navigate)
                    .service(quote::reset_wizard)
                    .service(quote::submit_quote)
                    .service(quote::quote_document)
                    .service(bookings::change_status)
                    .service(bookings::post_message)
                    .service(bookings::record_payment)
                    .service(bookings::request_hotel_stay)
                    .service(patient::show_dashboard)
                    .service(patient::show_quote)
                    .service(patient::cancel_quote)
                    .service(patient::accept_plan)
                    .service(patient::reject_plan)
                    .service(patient::show_booking)
                    .service(patient::show_documents)
                    .service(patient::upload_document)
                    .service(patient::delete_document)
                    .service(patient::download_document)
                    .service(patient::show_chart)
                    .service(clinic::show_dashboard)
                    .service(clinic::show_quote)
                    .service(clinic::create_plan)
                    .service(clinic::show_plan)
                    .service(clinic::add_plan_line)
                    .service(clinic::update_plan_line)
                    .service(clinic::delete_plan_line)
                    .service(clinic::send_plan)
                    .service(clinic::show_booking)
                    .service(clinic::schedule_appointment)
                    .service(clinic::cancel_appointment)
                    .service(clinic::show_patient_record)
                    .service(clinic::show_offers)
                    .service(clinic::submit_offer)
                    .service(clinic::edit_offer)
                    .service(clinic::delete_offer)
                    .service(clinic::show_catalog)
                    .service(clinic::create_package)
                    .service(clinic::update_package)
                    .service(clinic::set_package_active)
                    .service(clinic::set_price)
                    .service(admin::show_dashboard)
                    .service(admin::show_quotes)
                    .service(admin::show_quote)
                    .service(admin::assign_quote)
                    .service(admin::show_bookings)
                    .service(admin::show_booking)
                    .service(admin::show_clinics)
                    .service(admin::create_clinic)
                    .service(admin::show_staff)
                    .service(admin::assign_staff)
                    .service(admin::remove_staff)
                    .service(admin::update_clinic)
                    .service(admin::show_treatments)
                    .service(admin::create_treatment)
                    .service(admin::import_treatments)
                    .service(admin::update_treatment)
                    .service(admin::show_offers)
                    .service(admin::moderate_offer)
                    .service(admin::show_payments)
                    .service(admin::update_payment)
                    .service(admin::show_hotels)
                    .service(admin::create_hotel)
                    .service(admin::set_hotel_active)
                    .service(admin::update_hotel_stay)
                    .service(admin::show_users),
            )
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(upload_limit)
                    .memory_limit(upload_limit),
            )
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(repo.clone()))
            .app_data(publisher.clone())
            .app_data(web::Data::new(server_config.clone()))
    })
    .bind(bind_address)?
    .run()
    .await
}
