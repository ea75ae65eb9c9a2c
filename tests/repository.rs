use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use dental_marketplace::domain::auth::Portal;
use dental_marketplace::domain::booking::{
    BookingStatus, NewBooking, NewPayment, PaymentKind, PaymentStatus,
};
use dental_marketplace::domain::clinic::{Clinic, NewClinic, UpdateClinic};
use dental_marketplace::domain::dental_chart::{ToothCondition, ToothNumber};
use dental_marketplace::domain::message::{NewMessage, NewNotification};
use dental_marketplace::domain::package::{NewPackage, PackageItem};
use dental_marketplace::domain::quote::{NewQuoteLine, NewQuoteRequest, PatientInfo, QuoteStatus};
use dental_marketplace::domain::treatment::{ClinicTreatmentPrice, NewTreatment, Treatment};
use dental_marketplace::domain::treatment_plan::{NewPlanLine, NewTreatmentPlan, PlanStatus};
use dental_marketplace::domain::types::{
    CategoryName, CityName, ClinicName, Email, Money, PersonName, QuoteId, SafeText, Title,
    TreatmentName,
};
use dental_marketplace::domain::user::{NewUser, User};
use dental_marketplace::repository::{
    BookingListQuery, BookingReader, BookingWriter, ClinicListQuery, ClinicReader, ClinicWriter,
    DentalChartReader, DentalChartWriter, DieselRepository, MessageReader, MessageWriter,
    NotificationReader, NotificationWriter, PackageListQuery, PackageReader, PackageWriter,
    PlanReader, PlanWriter, QuoteDraftReader, QuoteDraftWriter, QuoteListQuery, QuoteReader,
    QuoteWriter, StatsReader, TreatmentReader, TreatmentWriter, UserReader, UserWriter,
};

mod common;

fn user(repo: &DieselRepository, email: &str, name: &str, portal: Portal) -> User {
    repo.upsert_user(&NewUser::new(
        Email::new(email).unwrap(),
        PersonName::new(name).unwrap(),
        portal,
    ))
    .unwrap()
}

fn clinic(repo: &DieselRepository, name: &str, city: &str, rating: i32, verified: bool) -> Clinic {
    let new_clinic = NewClinic::try_new(
        ClinicName::new(name).unwrap(),
        CityName::new(city).unwrap(),
        None,
        None,
        rating,
        100,
        verified,
    )
    .unwrap();
    repo.create_clinic(&new_clinic).unwrap()
}

fn treatment(repo: &DieselRepository, code: &str, name: &str, pounds: i64) -> Treatment {
    let new_treatment = NewTreatment::try_new(
        code,
        TreatmentName::new(name).unwrap(),
        CategoryName::new("Implants").unwrap(),
        Money::from_pounds(pounds),
        None,
    )
    .unwrap();
    repo.create_treatment(&new_treatment).unwrap()
}

fn quote_for(patient: &User, treatment: &Treatment) -> NewQuoteRequest {
    let total = Money::from_pence(treatment.base_price.pence() * 2).unwrap();
    NewQuoteRequest {
        patient_id: patient.id,
        clinic_id: None,
        promo_code: None,
        subtotal: total,
        discount: Money::ZERO,
        total,
        patient: PatientInfo {
            name: patient.name.clone(),
            email: patient.email.clone(),
            phone: None,
            travel_month: Some("2026-11".into()),
            notes: None,
        },
        lines: vec![NewQuoteLine {
            treatment_id: treatment.id,
            name: treatment.name.clone(),
            unit_price: treatment.base_price,
            quantity: 2,
        }],
    }
}

fn plan_for(
    quote_id: QuoteId,
    clinic: &Clinic,
    patient: &User,
    treatment: &Treatment,
    pounds: i64,
) -> NewTreatmentPlan {
    NewTreatmentPlan {
        quote_id,
        clinic_id: clinic.id,
        patient_id: patient.id,
        notes: None,
        lines: vec![
            NewPlanLine::try_new(
                Some(treatment.id),
                SafeText::new("Implant with abutment").unwrap(),
                2,
                Money::from_pounds(pounds),
            )
            .unwrap(),
        ],
    }
}

#[test]
fn test_user_upsert_refreshes_existing_email() {
    let test_db = common::TestDb::new("test_user_upsert_refreshes_existing_email.db");
    let repo = DieselRepository::new(test_db.pool());

    let first = user(&repo, "Alice@Example.com", "Alice", Portal::Patient);
    let second = user(&repo, "alice@example.com", "Alice Smith", Portal::Patient);
    assert_eq!(first.id, second.id);
    assert_eq!(second.name.as_str(), "Alice Smith");

    user(&repo, "bob@clinic.example", "Bob", Portal::Clinic);
    assert_eq!(repo.list_users(None).unwrap().len(), 2);
    let staff = repo.list_users(Some(Portal::Clinic)).unwrap();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].name.as_str(), "Bob");

    let found = repo
        .get_user_by_email(&Email::new("alice@example.com").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
}

#[test]
fn test_clinic_listing_staff_and_prices() {
    let test_db = common::TestDb::new("test_clinic_listing_staff_and_prices.db");
    let repo = DieselRepository::new(test_db.pool());

    let smile = clinic(&repo, "Smile Istanbul", "Istanbul", 47, true);
    let bright = clinic(&repo, "Bright Antalya", "Antalya", 42, true);
    clinic(&repo, "Unverified Dental", "Istanbul", 49, false);

    let (total, items) = repo.list_clinics(ClinicListQuery::default()).unwrap();
    assert_eq!(total, 3);
    assert_eq!(items[0].name.as_str(), "Unverified Dental");

    let (verified_total, verified) = repo
        .list_clinics(ClinicListQuery::default().verified_only())
        .unwrap();
    assert_eq!(verified_total, 2);
    assert_eq!(verified[0].id, smile.id);

    let (_, istanbul) = repo
        .list_clinics(ClinicListQuery::default().city("Istanbul").verified_only())
        .unwrap();
    assert_eq!(istanbul.len(), 1);

    let (search_total, found) = repo
        .list_clinics(ClinicListQuery::default().search("Antalya"))
        .unwrap();
    assert_eq!(search_total, 1);
    assert_eq!(found[0].id, bright.id);

    let (paged_total, page) = repo
        .list_clinics(ClinicListQuery::default().paginate(2, 2))
        .unwrap();
    assert_eq!(paged_total, 3);
    assert_eq!(page.len(), 1);

    assert_eq!(
        repo.get_clinic_by_slug("smile-istanbul").unwrap().unwrap().id,
        smile.id
    );

    let updates = UpdateClinic {
        name: ClinicName::new("Smile Istanbul Plus").unwrap(),
        city: smile.city.clone(),
        address: Some("Nisantasi".into()),
        description: None,
        rating: 48,
        price_factor: 90,
        verified: true,
    };
    let updated = repo.update_clinic(smile.id, &updates).unwrap();
    assert_eq!(updated.price_factor, 90);
    assert_eq!(updated.address.as_deref(), Some("Nisantasi"));

    let dentist = user(&repo, "dentist@smile.example", "Dr Kaya", Portal::Clinic);
    repo.assign_clinic_staff(smile.id, dentist.id).unwrap();
    assert_eq!(repo.list_clinic_staff(smile.id).unwrap().len(), 1);
    assert_eq!(
        repo.list_clinics_for_staff(dentist.id).unwrap()[0].id,
        smile.id
    );
    repo.remove_clinic_staff(smile.id, dentist.id).unwrap();
    assert!(repo.list_clinics_for_staff(dentist.id).unwrap().is_empty());

    let implant = treatment(&repo, "implant-std", "Standard implant", 2000);
    repo.set_clinic_price(&ClinicTreatmentPrice {
        clinic_id: smile.id,
        treatment_id: implant.id,
        price: Money::from_pounds(650),
    })
    .unwrap();
    repo.set_clinic_price(&ClinicTreatmentPrice {
        clinic_id: smile.id,
        treatment_id: implant.id,
        price: Money::from_pounds(600),
    })
    .unwrap();
    let prices = repo.list_prices_for_treatments(&[implant.id]).unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].price, Money::from_pounds(600));

    repo.remove_clinic_price(smile.id, implant.id).unwrap();
    assert!(repo.list_clinic_prices(smile.id).unwrap().is_empty());
}

#[test]
fn test_treatment_upsert_by_code() {
    let test_db = common::TestDb::new("test_treatment_upsert_by_code.db");
    let repo = DieselRepository::new(test_db.pool());

    let implant = treatment(&repo, "implant-std", "Standard implant", 2000);
    assert_eq!(implant.code, "IMPLANT-STD");

    let rows = vec![
        NewTreatment::try_new(
            "IMPLANT-STD",
            TreatmentName::new("Premium implant").unwrap(),
            CategoryName::new("Implants").unwrap(),
            Money::from_pounds(2400),
            None,
        )
        .unwrap(),
        NewTreatment::try_new(
            "VENEER",
            TreatmentName::new("Porcelain veneer").unwrap(),
            CategoryName::new("Cosmetic").unwrap(),
            Money::from_pounds(700),
            None,
        )
        .unwrap(),
    ];
    assert_eq!(repo.upsert_treatments(&rows).unwrap(), 2);

    let refreshed = repo.get_treatment_by_id(implant.id).unwrap().unwrap();
    assert_eq!(refreshed.name.as_str(), "Premium implant");
    assert_eq!(refreshed.base_price, Money::from_pounds(2400));

    assert_eq!(repo.list_treatments(None).unwrap().len(), 2);
    assert_eq!(
        repo.list_treatments(Some("Cosmetic".into())).unwrap().len(),
        1
    );
    assert_eq!(
        repo.list_treatment_categories().unwrap(),
        vec!["Cosmetic".to_string(), "Implants".to_string()]
    );
}

#[test]
fn test_quote_plan_versions_and_acceptance() {
    let test_db = common::TestDb::new("test_quote_plan_versions_and_acceptance.db");
    let repo = DieselRepository::new(test_db.pool());

    let patient = user(&repo, "patient@example.com", "Pat Jones", Portal::Patient);
    let smile = clinic(&repo, "Smile Istanbul", "Istanbul", 47, true);
    let implant = treatment(&repo, "implant-std", "Standard implant", 2000);

    let quote = repo.create_quote(&quote_for(&patient, &implant)).unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);
    assert_eq!(quote.lines.len(), 1);
    assert_eq!(quote.total, Money::from_pounds(4000));

    let (mine, _) = repo
        .list_quotes(QuoteListQuery::default().patient(patient.id))
        .unwrap();
    assert_eq!(mine, 1);

    let assigned = repo.assign_quote_clinic(quote.id, smile.id).unwrap();
    assert_eq!(assigned.clinic_id, Some(smile.id));

    let first = repo
        .create_plan(&plan_for(quote.id, &smile, &patient, &implant, 700))
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.status, PlanStatus::Draft);
    repo.update_plan_status(first.id, PlanStatus::Sent).unwrap();

    let second = repo
        .create_plan(&plan_for(quote.id, &smile, &patient, &implant, 650))
        .unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(second.total(), Money::from_pounds(1300));

    let plans = repo.list_plans_for_quote(quote.id).unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].id, second.id);
    assert_eq!(plans[1].status, PlanStatus::Superseded);

    let line = second.lines[0].clone();
    let edited = repo
        .update_plan_line(
            line.id,
            &NewPlanLine::try_new(
                line.treatment_id,
                SafeText::new("Implant, titanium").unwrap(),
                3,
                Money::from_pounds(650),
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(edited.quantity, 3);

    let sent = repo.update_plan_status(second.id, PlanStatus::Sent).unwrap();
    let booking = repo
        .accept_plan(
            sent.id,
            &NewBooking {
                reference: "DM-TEST01".into(),
                patient_id: patient.id,
                clinic_id: smile.id,
                plan_id: sent.id,
                total: sent.total(),
                deposit: Money::from_pounds(195),
                arrival_date: NaiveDate::from_ymd_opt(2026, 11, 20),
            },
        )
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total, Money::from_pounds(1950));

    let accepted_quote = repo.get_quote_by_id(quote.id).unwrap().unwrap();
    assert_eq!(accepted_quote.status, QuoteStatus::Accepted);
    assert_eq!(
        repo.get_plan_by_id(sent.id).unwrap().unwrap().status,
        PlanStatus::Accepted
    );
    assert_eq!(
        repo.get_booking_by_reference("DM-TEST01").unwrap().unwrap().id,
        booking.id
    );
    assert!(repo.clinic_has_patient(&[smile.id], patient.id).unwrap());
}

#[test]
fn test_bookings_payments_messages_and_stats() {
    let test_db = common::TestDb::new("test_bookings_payments_messages_and_stats.db");
    let repo = DieselRepository::new(test_db.pool());

    let patient = user(&repo, "patient@example.com", "Pat Jones", Portal::Patient);
    let dentist = user(&repo, "dentist@smile.example", "Dr Kaya", Portal::Clinic);
    let smile = clinic(&repo, "Smile Istanbul", "Istanbul", 47, true);
    repo.assign_clinic_staff(smile.id, dentist.id).unwrap();
    let implant = treatment(&repo, "implant-std", "Standard implant", 2000);

    let quote = repo.create_quote(&quote_for(&patient, &implant)).unwrap();
    let plan = repo
        .create_plan(&plan_for(quote.id, &smile, &patient, &implant, 700))
        .unwrap();
    let booking = repo
        .accept_plan(
            plan.id,
            &NewBooking {
                reference: "DM-TEST02".into(),
                patient_id: patient.id,
                clinic_id: smile.id,
                plan_id: plan.id,
                total: plan.total(),
                deposit: Money::from_pounds(210),
                arrival_date: None,
            },
        )
        .unwrap();

    let confirmed = repo
        .update_booking_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    let (confirmed_total, _) = repo
        .list_bookings(BookingListQuery::default().status(BookingStatus::Confirmed))
        .unwrap();
    assert_eq!(confirmed_total, 1);

    let deposit = repo
        .create_payment(&NewPayment {
            booking_id: booking.id,
            amount: Money::from_pounds(210),
            kind: PaymentKind::Deposit,
            reference: Some("card-123".into()),
        })
        .unwrap();
    assert_eq!(deposit.status, PaymentStatus::Pending);
    repo.update_payment_status(deposit.id, PaymentStatus::Succeeded)
        .unwrap();
    let refund = repo
        .create_payment(&NewPayment {
            booking_id: booking.id,
            amount: Money::from_pounds(10),
            kind: PaymentKind::Refund,
            reference: None,
        })
        .unwrap();
    repo.update_payment_status(refund.id, PaymentStatus::Succeeded)
        .unwrap();
    assert_eq!(repo.list_payments(booking.id).unwrap().len(), 2);

    let stats = repo.dashboard_stats().unwrap();
    assert_eq!(stats.pending_quotes, 0);
    assert_eq!(stats.revenue, Money::from_pounds(200));
    assert_eq!(stats.bookings_by_status, vec![("confirmed".to_string(), 1)]);

    repo.create_message(&NewMessage {
        booking_id: booking.id,
        sender_id: patient.id,
        body: SafeText::new("When should I arrive?").unwrap(),
    })
    .unwrap();
    assert_eq!(repo.count_unread_messages(dentist.id).unwrap(), 1);
    assert_eq!(repo.count_unread_messages(patient.id).unwrap(), 0);

    let marked = repo
        .mark_messages_read(booking.id, dentist.id, Utc::now().naive_utc())
        .unwrap();
    assert_eq!(marked, 1);
    assert_eq!(repo.count_unread_messages(dentist.id).unwrap(), 0);
    assert_eq!(repo.list_messages(booking.id).unwrap().len(), 1);
}

#[test]
fn test_notifications_belong_to_their_user() {
    let test_db = common::TestDb::new("test_notifications_belong_to_their_user.db");
    let repo = DieselRepository::new(test_db.pool());

    let alice = user(&repo, "alice@example.com", "Alice", Portal::Patient);
    let bob = user(&repo, "bob@example.com", "Bob", Portal::Patient);

    let stored = repo
        .create_notifications(&[
            NewNotification::new(
                alice.id,
                Title::new("Plan ready").unwrap(),
                "Your clinic sent a plan.",
                Some("/quote/1".into()),
            ),
            NewNotification::new(alice.id, Title::new("Reminder").unwrap(), "Upload x-rays.", None),
            NewNotification::new(bob.id, Title::new("Welcome").unwrap(), "Hello.", None),
        ])
        .unwrap();
    assert_eq!(stored, 3);
    assert_eq!(repo.count_unread_notifications(alice.id).unwrap(), 2);

    let alice_notes = repo.list_notifications(alice.id, true, 10).unwrap();
    assert_eq!(alice_notes.len(), 2);
    let bob_note = repo.list_notifications(bob.id, false, 10).unwrap()[0].clone();

    assert!(!repo.mark_notification_read(bob_note.id, alice.id).unwrap());
    assert!(repo.mark_notification_read(alice_notes[0].id, alice.id).unwrap());
    assert_eq!(repo.count_unread_notifications(alice.id).unwrap(), 1);

    assert_eq!(repo.mark_all_notifications_read(alice.id).unwrap(), 1);
    assert_eq!(repo.count_unread_notifications(alice.id).unwrap(), 0);
    assert_eq!(repo.count_unread_notifications(bob.id).unwrap(), 1);
}

#[test]
fn test_dental_chart_is_replaced_on_save() {
    let test_db = common::TestDb::new("test_dental_chart_is_replaced_on_save.db");
    let repo = DieselRepository::new(test_db.pool());
    let patient = user(&repo, "patient@example.com", "Pat Jones", Portal::Patient);

    assert!(repo.get_dental_chart(patient.id).unwrap().is_none());

    let mut teeth = BTreeMap::new();
    teeth.insert(ToothNumber::new(16).unwrap(), ToothCondition::Crown);
    teeth.insert(ToothNumber::new(36).unwrap(), ToothCondition::Missing);
    repo.save_dental_chart(patient.id, &teeth).unwrap();

    let mut replacement = BTreeMap::new();
    replacement.insert(ToothNumber::new(11).unwrap(), ToothCondition::Implant);
    let saved = repo.save_dental_chart(patient.id, &replacement).unwrap();
    assert_eq!(saved.teeth, replacement);

    let loaded = repo.get_dental_chart(patient.id).unwrap().unwrap();
    assert_eq!(loaded.teeth.len(), 1);
    assert!(loaded.updated_at.is_some());
}

#[test]
fn test_quote_drafts_are_replaced_and_pruned() {
    let test_db = common::TestDb::new("test_quote_drafts_are_replaced_and_pruned.db");
    let repo = DieselRepository::new(test_db.pool());

    assert!(repo.get_quote_draft("first").unwrap().is_none());

    // Larger than a cookie can carry.
    let bulky = format!("{{\"notes\":\"{}\"}}", "x".repeat(8_000));
    repo.save_quote_draft("first", "{}").unwrap();
    repo.save_quote_draft("first", &bulky).unwrap();
    repo.save_quote_draft("second", "{}").unwrap();
    assert_eq!(repo.get_quote_draft("first").unwrap(), Some(bulky));

    repo.delete_quote_draft("second").unwrap();
    assert!(repo.get_quote_draft("second").unwrap().is_none());

    let past = Utc::now().naive_utc() - Duration::days(1);
    assert_eq!(repo.delete_quote_drafts_before(past).unwrap(), 0);
    let future = Utc::now().naive_utc() + Duration::days(1);
    assert_eq!(repo.delete_quote_drafts_before(future).unwrap(), 1);
    assert!(repo.get_quote_draft("first").unwrap().is_none());
}

#[test]
fn test_packages_keep_their_items() {
    let test_db = common::TestDb::new("test_packages_keep_their_items.db");
    let repo = DieselRepository::new(test_db.pool());
    let clinic = clinic(&repo, "Smile Istanbul", "Istanbul", 48, true);
    let implant = treatment(&repo, "IMP-1", "Implant", 500);
    let crown = treatment(&repo, "CRW-1", "Crown", 200);

    let package = |name: &str, items: Vec<PackageItem>| {
        NewPackage::try_new(
            clinic.id,
            Title::new(name).unwrap(),
            None,
            Money::from_pounds(900),
            3,
            items,
        )
        .unwrap()
    };
    let smile = repo
        .create_package(&package(
            "Smile makeover",
            vec![
                PackageItem { treatment_id: crown.id, quantity: 4 },
                PackageItem { treatment_id: implant.id, quantity: 1 },
            ],
        ))
        .unwrap();
    let single = repo
        .create_package(&package(
            "Single implant",
            vec![PackageItem { treatment_id: implant.id, quantity: 1 }],
        ))
        .unwrap();
    assert_eq!(smile.items.len(), 2);

    let updated = repo
        .update_package(
            single.id,
            &package(
                "Single implant",
                vec![PackageItem { treatment_id: implant.id, quantity: 2 }],
            ),
        )
        .unwrap();
    assert_eq!(updated.items, vec![PackageItem { treatment_id: implant.id, quantity: 2 }]);

    let listed = repo
        .list_packages(PackageListQuery::default().clinic(clinic.id))
        .unwrap();
    assert_eq!(listed.len(), 2);
    let reloaded_smile = listed.iter().find(|p| p.id == smile.id).unwrap();
    assert_eq!(reloaded_smile.items.len(), 2);
    let reloaded_single = listed.iter().find(|p| p.id == single.id).unwrap();
    assert_eq!(reloaded_single.items[0].quantity, 2);

    repo.set_package_active(single.id, false).unwrap();
    let active = repo
        .list_packages(PackageListQuery::default().active_only())
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, smile.id);
    assert_eq!(
        repo.get_package_by_id(smile.id).unwrap().unwrap().items.len(),
        2
    );
}
