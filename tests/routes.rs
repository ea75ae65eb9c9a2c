use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use actix_web_flash_messages::{FlashMessagesFramework, Level, storage::CookieMessageStore};
use serde_json::{Value, json};

use dental_marketplace::auth::encode_token;
use dental_marketplace::build_tera;
use dental_marketplace::domain::auth::{AuthenticatedUser, CLINIC_ROLE, PATIENT_ROLE};
use dental_marketplace::domain::clinic::NewClinic;
use dental_marketplace::domain::hotel::NewHotel;
use dental_marketplace::domain::special_offer::{NewSpecialOffer, OfferStatus};
use dental_marketplace::domain::treatment::NewTreatment;
use dental_marketplace::domain::types::{
    CategoryName, CityName, ClinicName, ImageUrl, Money, Title, TreatmentName,
};
use dental_marketplace::models::config::ServerConfig;
use dental_marketplace::repository::{
    ClinicListQuery, ClinicReader, ClinicWriter, DieselRepository, HotelWriter, OfferWriter,
    TreatmentWriter,
};
use dental_marketplace::routes::{alert_level_to_str, api, quote};
use dental_marketplace::services::events::{EventPublisher, NoopPublisher};

mod common;

const SECRET: &str = "integration-test-secret-integration-test-secret-integration-test";

fn server_config() -> ServerConfig {
    ServerConfig {
        domain: "localhost".into(),
        address: "127.0.0.1".into(),
        port: 8080,
        database_url: ":memory:".into(),
        templates_dir: "templates/**/*".into(),
        uploads_dir: "uploads".into(),
        secret: SECRET.into(),
        auth_service_url: "http://localhost:8000/auth/signin".into(),
        zmq_events_pub: "inproc://events".into(),
        max_upload_mb: 20,
    }
}

fn bearer(email: &str, role: &str) -> (header::HeaderName, String) {
    let claims = AuthenticatedUser {
        sub: "1".into(),
        email: email.into(),
        name: "Test User".into(),
        roles: vec![role.into()],
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode_token(&claims, SECRET).unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

macro_rules! api_app {
    ($repo:expr) => {{
        let publisher: Arc<dyn EventPublisher> = Arc::new(NoopPublisher);
        test::init_service(
            App::new()
                .wrap(actix_identity::IdentityMiddleware::default())
                .wrap(SessionMiddleware::new(CookieSessionStore::default(), Key::generate()))
                .app_data(web::Data::new($repo.clone()))
                .app_data(web::Data::from(publisher))
                .app_data(web::Data::new(server_config()))
                .service(
                    web::scope("/api")
                        .service(api::homepage_offers)
                        .service(api::compare_clinics)
                        .service(api::clinic_detail)
                        .service(api::list_hotels)
                        .service(api::get_dental_chart)
                        .service(api::save_dental_chart)
                        .service(api::me),
                ),
        )
        .await
    }};
}

fn seed_clinic(repo: &DieselRepository, name: &str, price_factor: i32) {
    let clinic = NewClinic::try_new(
        ClinicName::new(name).unwrap(),
        CityName::new("Istanbul").unwrap(),
        None,
        None,
        45,
        price_factor,
        true,
    )
    .unwrap();
    repo.create_clinic(&clinic).unwrap();
}

#[core::prelude::v1::test]
fn test_alert_level_to_str_mappings() {
    assert_eq!(alert_level_to_str(&Level::Error), "danger");
    assert_eq!(alert_level_to_str(&Level::Warning), "warning");
    assert_eq!(alert_level_to_str(&Level::Success), "success");
    assert_eq!(alert_level_to_str(&Level::Info), "info");
    assert_eq!(alert_level_to_str(&Level::Debug), "info");
}

#[core::prelude::v1::test]
fn test_templates_parse() {
    let tera = build_tera("templates/**/*").unwrap();
    assert!(tera.get_template_names().any(|name| name == "quote/wizard.html"));
}

#[actix_web::test]
async fn homepage_offers_are_empty_without_approved_offers() {
    let test_db = common::TestDb::new("homepage_offers_are_empty.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::get()
        .uri("/api/special-offers/homepage")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn homepage_offers_follow_moderation_and_image_changes() {
    let test_db = common::TestDb::new("homepage_offers_follow_moderation.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clinic(&repo, "Bright Smile", 90);
    let (_, clinics) = repo.list_clinics(ClinicListQuery::default()).unwrap();
    let clinic_id = clinics[0].id;

    let now = chrono::Utc::now().naive_utc();
    let offer = |image: &str| {
        NewSpecialOffer::try_new(
            clinic_id,
            Title::new("Spring implants").unwrap(),
            None,
            25,
            None,
            Some(ImageUrl::new(image).unwrap()),
            now - chrono::Duration::days(1),
            now + chrono::Duration::days(7),
        )
        .unwrap()
    };
    let created = repo
        .create_offer(&offer("https://cdn.example.com/offers/spring.jpg"))
        .unwrap();
    let app = api_app!(repo);
    let homepage = || {
        test::TestRequest::get()
            .uri("/api/special-offers/homepage")
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, homepage()).await;
    assert_eq!(body, json!([]));

    repo.moderate_offer(created.id, OfferStatus::Approved, None)
        .unwrap();
    let body: Value = test::call_and_read_body_json(&app, homepage()).await;
    assert_eq!(body[0]["id"], json!(created.id.get()));
    assert_eq!(
        body[0]["image_url"],
        json!("https://cdn.example.com/offers/spring.jpg?v=1")
    );

    repo.update_offer(
        created.id,
        &offer("https://cdn.example.com/offers/spring.jpg?size=large"),
        2,
    )
    .unwrap();
    let body: Value = test::call_and_read_body_json(&app, homepage()).await;
    assert_eq!(body, json!([]));

    repo.moderate_offer(created.id, OfferStatus::Approved, None)
        .unwrap();
    let body: Value = test::call_and_read_body_json(&app, homepage()).await;
    assert_eq!(
        body[0]["image_url"],
        json!("https://cdn.example.com/offers/spring.jpg?size=large&v=2")
    );
}

#[actix_web::test]
async fn hotels_are_filtered_by_city_and_activity() {
    let test_db = common::TestDb::new("hotels_are_filtered_by_city.db");
    let repo = DieselRepository::new(test_db.pool());
    let hotel = |name: &str, city: &str| {
        NewHotel::try_new(
            Title::new(name).unwrap(),
            CityName::new(city).unwrap(),
            4,
            Money::from_pounds(90),
        )
        .unwrap()
    };
    repo.create_hotel(&hotel("Bosphorus Suites", "Istanbul")).unwrap();
    let closed = repo.create_hotel(&hotel("Old Town Inn", "Istanbul")).unwrap();
    repo.set_hotel_active(closed.id, false).unwrap();
    repo.create_hotel(&hotel("Lara Beach", "Antalya")).unwrap();
    let app = api_app!(repo);

    let req = test::TestRequest::get()
        .uri("/api/v1/hotels?city=Istanbul")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|hotel| hotel["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bosphorus Suites"]);
}

#[actix_web::test]
async fn wizard_session_carries_only_a_draft_token() {
    let test_db = common::TestDb::new("wizard_session_carries_only_a_draft_token.db");
    let repo = DieselRepository::new(test_db.pool());
    let mut treatment_ids = Vec::new();
    for n in 0..40 {
        let name = format!(
            "Full arch restoration with zirconia bridge, variant {n:02} {}",
            "x".repeat(60)
        );
        let treatment = repo
            .create_treatment(
                &NewTreatment::try_new(
                    &format!("ARCH{n:02}"),
                    TreatmentName::new(name).unwrap(),
                    CategoryName::new("Restorative").unwrap(),
                    Money::from_pounds(100 + n),
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        treatment_ids.push(treatment.id.get());
    }

    let key = Key::from(SECRET.as_bytes());
    let app = test::init_service(
        App::new()
            .wrap(
                FlashMessagesFramework::builder(CookieMessageStore::builder(key.clone()).build())
                    .build(),
            )
            .wrap(SessionMiddleware::new(CookieSessionStore::default(), key))
            .app_data(web::Data::new(repo.clone()))
            .service(quote::add_treatment)
            .service(web::scope("/api").service(api::quote_summary)),
    )
    .await;

    let mut session_cookie: Option<actix_web::cookie::Cookie<'static>> = None;
    for id in &treatment_ids {
        let mut req = test::TestRequest::post()
            .uri("/quote/treatments/add")
            .set_form([("treatment_id", id.to_string()), ("quantity", "1".to_string())]);
        if let Some(cookie) = &session_cookie {
            req = req.cookie(cookie.clone());
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        if let Some(cookie) = resp.response().cookies().find(|c| c.name() == "id") {
            let size = cookie.value().len();
            assert!(size < 512, "session cookie grew to {size} bytes");
            session_cookie = Some(cookie.into_owned());
        }
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/quote/summary")
        .cookie(session_cookie.expect("session cookie was set"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["lines"].as_array().unwrap().len(), treatment_ids.len());
}

#[actix_web::test]
async fn comparison_lists_cheapest_clinic_first() {
    let test_db = common::TestDb::new("comparison_lists_cheapest_clinic_first.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clinic(&repo, "Full Price Dental", 100);
    seed_clinic(&repo, "Budget Smiles", 80);
    let implant = repo
        .create_treatment(
            &NewTreatment::try_new(
                "IMPLANT",
                TreatmentName::new("Implant").unwrap(),
                CategoryName::new("Implants").unwrap(),
                Money::from_pounds(500),
                None,
            )
            .unwrap(),
        )
        .unwrap();
    let app = api_app!(repo);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/clinics/compare?treatment={}:2",
            implant.id.get()
        ))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let comparisons = body.as_array().unwrap();
    assert_eq!(comparisons.len(), 2);
    assert_eq!(comparisons[0]["clinic"]["name"], "Budget Smiles");
    assert_eq!(comparisons[0]["total"], 80_000);
    assert_eq!(comparisons[1]["total"], 100_000);
}

#[actix_web::test]
async fn comparison_rejects_malformed_basket() {
    let test_db = common::TestDb::new("comparison_rejects_malformed_basket.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::get()
        .uri("/api/v1/clinics/compare?treatment=implant")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn api_requires_a_token() {
    let test_db = common::TestDb::new("api_requires_a_token.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn me_reports_the_portal() {
    let test_db = common::TestDb::new("me_reports_the_portal.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("dentist@clinic.example", CLINIC_ROLE))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["email"], "dentist@clinic.example");
    assert_eq!(body["portal"], "clinic");
}

#[actix_web::test]
async fn patient_saves_and_reloads_dental_chart() {
    let test_db = common::TestDb::new("patient_saves_and_reloads_dental_chart.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::post()
        .uri("/api/v1/dental-chart")
        .insert_header(bearer("patient@example.com", PATIENT_ROLE))
        .set_json(json!({ "teeth": { "16": "crown", "36": "missing" } }))
        .to_request();
    let saved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(saved["teeth"]["16"], "crown");

    let req = test::TestRequest::get()
        .uri("/api/get-dental-chart")
        .insert_header(bearer("patient@example.com", PATIENT_ROLE))
        .to_request();
    let loaded: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(loaded["teeth"]["36"], "missing");
    assert_eq!(loaded["teeth"].as_object().unwrap().len(), 2);
}

#[actix_web::test]
async fn dental_chart_rejects_invalid_teeth_and_other_portals() {
    let test_db = common::TestDb::new("dental_chart_rejects_invalid_teeth.db");
    let repo = DieselRepository::new(test_db.pool());
    let app = api_app!(repo);

    let req = test::TestRequest::post()
        .uri("/api/v1/dental-chart")
        .insert_header(bearer("patient@example.com", PATIENT_ROLE))
        .set_json(json!({ "teeth": { "19": "crown" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/dental-chart")
        .insert_header(bearer("dentist@clinic.example", CLINIC_ROLE))
        .set_json(json!({ "teeth": {} }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
