use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::{DbConnection, DbPool};
use crate::domain::auth::Portal;
use crate::domain::booking::{
    Appointment, Booking, BookingStatus, NewAppointment, NewBooking, NewPayment, Payment,
    PaymentStatus,
};
use crate::domain::clinic::{Clinic, NewClinic, UpdateClinic};
use crate::domain::dental_chart::{ChartTeeth, DentalChart};
use crate::domain::document::{Document, NewDocument};
use crate::domain::hotel::{Hotel, HotelBooking, HotelBookingStatus, NewHotel, NewHotelBooking};
use crate::domain::message::{Message, NewMessage, NewNotification, Notification};
use crate::domain::package::{NewPackage, TreatmentPackage};
use crate::domain::quote::{NewQuoteRequest, QuoteRequest, QuoteStatus};
use crate::domain::special_offer::{NewSpecialOffer, OfferStatus, SpecialOffer};
use crate::domain::treatment::{ClinicTreatmentPrice, NewTreatment, Treatment, UpdateTreatment};
use crate::domain::treatment_plan::{
    NewPlanLine, NewTreatmentPlan, PlanStatus, TreatmentPlan, TreatmentPlanLine,
};
use crate::domain::types::{
    AppointmentId, BookingId, CityName, ClinicId, DocumentId, Email, HotelBookingId, HotelId,
    Money, NotificationId, OfferId, PackageId, PaymentId, PlanId, PlanLineId, PromoCode, QuoteId,
    SafeText, TreatmentId, UserId,
};
use crate::domain::user::{NewUser, User};
use crate::pagination::Pagination;
use crate::repository::errors::RepositoryResult;

pub mod booking;
pub mod clinic;
pub mod dental_chart;
pub mod document;
pub mod errors;
pub mod hotel;
pub mod message;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod offer;
pub mod package;
pub mod plan;
pub mod quote;
pub mod quote_draft;
pub mod stats;
pub mod treatment;
pub mod user;

/// Diesel-backed implementation of every repository trait.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClinicListQuery {
    pub city: Option<String>,
    pub verified_only: bool,
    pub search: Option<String>,
    pub pagination: Option<Pagination>,
}

impl ClinicListQuery {
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn verified_only(mut self) -> Self {
        self.verified_only = true;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination::new(page, per_page));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackageListQuery {
    pub clinic_id: Option<ClinicId>,
    pub active_only: bool,
}

impl PackageListQuery {
    pub fn clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuoteListQuery {
    pub patient_id: Option<UserId>,
    pub clinic_id: Option<ClinicId>,
    pub status: Option<QuoteStatus>,
    pub pagination: Option<Pagination>,
}

impl QuoteListQuery {
    pub fn patient(mut self, patient_id: UserId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn status(mut self, status: QuoteStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination::new(page, per_page));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingListQuery {
    pub patient_id: Option<UserId>,
    pub clinic_id: Option<ClinicId>,
    pub status: Option<BookingStatus>,
    pub pagination: Option<Pagination>,
}

impl BookingListQuery {
    pub fn patient(mut self, patient_id: UserId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination::new(page, per_page));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct OfferListQuery {
    pub clinic_id: Option<ClinicId>,
    pub status: Option<OfferStatus>,
}

impl OfferListQuery {
    pub fn clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    pub fn status(mut self, status: OfferStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub pending_quotes: usize,
    pub pending_offers: usize,
    /// `(status, count)` pairs for every status that has bookings.
    pub bookings_by_status: Vec<(String, usize)>,
    /// Sum of succeeded deposits and balances minus succeeded refunds.
    pub revenue: Money,
}

pub trait UserReader {
    fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
    fn get_user_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;
    fn list_users(&self, portal: Option<Portal>) -> RepositoryResult<Vec<User>>;
}

pub trait UserWriter {
    /// Inserts the user or refreshes name and portal of the existing email.
    fn upsert_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
}

pub trait ClinicReader {
    fn get_clinic_by_id(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>>;
    fn get_clinic_by_slug(&self, slug: &str) -> RepositoryResult<Option<Clinic>>;
    fn list_clinics(&self, query: ClinicListQuery) -> RepositoryResult<(usize, Vec<Clinic>)>;
    fn list_clinics_for_staff(&self, user_id: UserId) -> RepositoryResult<Vec<Clinic>>;
    fn list_clinic_staff(&self, clinic_id: ClinicId) -> RepositoryResult<Vec<User>>;
    fn list_clinic_prices(&self, clinic_id: ClinicId)
    -> RepositoryResult<Vec<ClinicTreatmentPrice>>;
    /// Overrides of every clinic for the given treatments.
    fn list_prices_for_treatments(
        &self,
        treatment_ids: &[TreatmentId],
    ) -> RepositoryResult<Vec<ClinicTreatmentPrice>>;
}

pub trait ClinicWriter {
    fn create_clinic(&self, new_clinic: &NewClinic) -> RepositoryResult<Clinic>;
    fn update_clinic(&self, id: ClinicId, updates: &UpdateClinic) -> RepositoryResult<Clinic>;
    fn assign_clinic_staff(&self, clinic_id: ClinicId, user_id: UserId) -> RepositoryResult<()>;
    fn remove_clinic_staff(&self, clinic_id: ClinicId, user_id: UserId) -> RepositoryResult<()>;
    fn set_clinic_price(&self, price: &ClinicTreatmentPrice) -> RepositoryResult<()>;
    fn remove_clinic_price(
        &self,
        clinic_id: ClinicId,
        treatment_id: TreatmentId,
    ) -> RepositoryResult<()>;
}

pub trait TreatmentReader {
    fn get_treatment_by_id(&self, id: TreatmentId) -> RepositoryResult<Option<Treatment>>;
    fn get_treatments_by_ids(&self, ids: &[TreatmentId]) -> RepositoryResult<Vec<Treatment>>;
    fn list_treatments(&self, category: Option<String>) -> RepositoryResult<Vec<Treatment>>;
    fn list_treatment_categories(&self) -> RepositoryResult<Vec<String>>;
}

pub trait TreatmentWriter {
    fn create_treatment(&self, new_treatment: &NewTreatment) -> RepositoryResult<Treatment>;
    fn update_treatment(
        &self,
        id: TreatmentId,
        updates: &UpdateTreatment,
    ) -> RepositoryResult<Treatment>;
    /// Inserts or updates treatments keyed by code, returning affected rows.
    fn upsert_treatments(&self, treatments: &[NewTreatment]) -> RepositoryResult<usize>;
}

pub trait PackageReader {
    fn get_package_by_id(&self, id: PackageId) -> RepositoryResult<Option<TreatmentPackage>>;
    fn list_packages(&self, query: PackageListQuery) -> RepositoryResult<Vec<TreatmentPackage>>;
}

pub trait PackageWriter {
    fn create_package(&self, new_package: &NewPackage) -> RepositoryResult<TreatmentPackage>;
    fn update_package(
        &self,
        id: PackageId,
        updates: &NewPackage,
    ) -> RepositoryResult<TreatmentPackage>;
    fn set_package_active(&self, id: PackageId, active: bool) -> RepositoryResult<()>;
}

pub trait QuoteReader {
    fn get_quote_by_id(&self, id: QuoteId) -> RepositoryResult<Option<QuoteRequest>>;
    fn list_quotes(&self, query: QuoteListQuery) -> RepositoryResult<(usize, Vec<QuoteRequest>)>;
}

pub trait QuoteWriter {
    fn create_quote(&self, new_quote: &NewQuoteRequest) -> RepositoryResult<QuoteRequest>;
    fn update_quote_status(
        &self,
        id: QuoteId,
        status: QuoteStatus,
    ) -> RepositoryResult<QuoteRequest>;
    fn assign_quote_clinic(
        &self,
        id: QuoteId,
        clinic_id: ClinicId,
    ) -> RepositoryResult<QuoteRequest>;
}

pub trait PlanReader {
    fn get_plan_by_id(&self, id: PlanId) -> RepositoryResult<Option<TreatmentPlan>>;
    /// Every version for the quote, newest first.
    fn list_plans_for_quote(&self, quote_id: QuoteId) -> RepositoryResult<Vec<TreatmentPlan>>;
    fn get_plan_line(&self, id: PlanLineId) -> RepositoryResult<Option<TreatmentPlanLine>>;
}

pub trait PlanWriter {
    /// Inserts the next version and supersedes open earlier versions of the same clinic.
    fn create_plan(&self, new_plan: &NewTreatmentPlan) -> RepositoryResult<TreatmentPlan>;
    fn update_plan_status(&self, id: PlanId, status: PlanStatus)
    -> RepositoryResult<TreatmentPlan>;
    fn add_plan_line(&self, plan_id: PlanId, line: &NewPlanLine)
    -> RepositoryResult<TreatmentPlanLine>;
    fn update_plan_line(
        &self,
        id: PlanLineId,
        line: &NewPlanLine,
    ) -> RepositoryResult<TreatmentPlanLine>;
    fn delete_plan_line(&self, id: PlanLineId) -> RepositoryResult<()>;
    /// Accepts the plan, rejects the other sent plans of the quote, marks the
    /// quote accepted and creates the booking in one transaction.
    fn accept_plan(&self, id: PlanId, booking: &NewBooking) -> RepositoryResult<Booking>;
}

pub trait BookingReader {
    fn get_booking_by_id(&self, id: BookingId) -> RepositoryResult<Option<Booking>>;
    fn get_booking_by_reference(&self, reference: &str) -> RepositoryResult<Option<Booking>>;
    fn list_bookings(&self, query: BookingListQuery) -> RepositoryResult<(usize, Vec<Booking>)>;
    /// Whether any of `clinic_ids` has a booking with the patient.
    fn clinic_has_patient(
        &self,
        clinic_ids: &[ClinicId],
        patient_id: UserId,
    ) -> RepositoryResult<bool>;
    fn list_appointments(&self, booking_id: BookingId) -> RepositoryResult<Vec<Appointment>>;
    /// Appointments of the clinic starting in `[from, to)`.
    fn list_clinic_appointments(
        &self,
        clinic_id: ClinicId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<Appointment>>;
    fn get_payment_by_id(&self, id: PaymentId) -> RepositoryResult<Option<Payment>>;
    fn list_payments(&self, booking_id: BookingId) -> RepositoryResult<Vec<Payment>>;
    fn list_payments_by_status(
        &self,
        status: Option<PaymentStatus>,
    ) -> RepositoryResult<Vec<Payment>>;
}

pub trait BookingWriter {
    fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking>;
    fn create_appointment(&self, appointment: &NewAppointment) -> RepositoryResult<Appointment>;
    fn delete_appointment(&self, id: AppointmentId) -> RepositoryResult<()>;
    fn create_payment(&self, payment: &NewPayment) -> RepositoryResult<Payment>;
    fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> RepositoryResult<Payment>;
}

pub trait HotelReader {
    fn get_hotel_by_id(&self, id: HotelId) -> RepositoryResult<Option<Hotel>>;
    fn list_hotels(&self, city: Option<CityName>, active_only: bool)
    -> RepositoryResult<Vec<Hotel>>;
    fn get_hotel_booking_by_id(&self, id: HotelBookingId)
    -> RepositoryResult<Option<HotelBooking>>;
    fn list_hotel_bookings(&self, booking_id: BookingId) -> RepositoryResult<Vec<HotelBooking>>;
    fn list_hotel_bookings_by_status(
        &self,
        status: Option<HotelBookingStatus>,
    ) -> RepositoryResult<Vec<HotelBooking>>;
}

pub trait HotelWriter {
    fn create_hotel(&self, hotel: &NewHotel) -> RepositoryResult<Hotel>;
    fn set_hotel_active(&self, id: HotelId, active: bool) -> RepositoryResult<()>;
    fn create_hotel_booking(&self, stay: &NewHotelBooking) -> RepositoryResult<HotelBooking>;
    fn update_hotel_booking_status(
        &self,
        id: HotelBookingId,
        status: HotelBookingStatus,
    ) -> RepositoryResult<HotelBooking>;
}

pub trait MessageReader {
    /// Thread of a booking, oldest first.
    fn list_messages(&self, booking_id: BookingId) -> RepositoryResult<Vec<Message>>;
    /// Unread messages from others across every booking the user takes part in.
    fn count_unread_messages(&self, user_id: UserId) -> RepositoryResult<usize>;
}

pub trait MessageWriter {
    fn create_message(&self, message: &NewMessage) -> RepositoryResult<Message>;
    /// Marks messages of the thread not sent by `reader` as read.
    fn mark_messages_read(
        &self,
        booking_id: BookingId,
        reader: UserId,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize>;
}

pub trait NotificationReader {
    fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
    ) -> RepositoryResult<Vec<Notification>>;
    fn count_unread_notifications(&self, user_id: UserId) -> RepositoryResult<usize>;
}

pub trait NotificationWriter {
    fn create_notifications(&self, notifications: &[NewNotification]) -> RepositoryResult<usize>;
    /// Returns `false` when the notification does not belong to the user.
    fn mark_notification_read(&self, id: NotificationId, user_id: UserId)
    -> RepositoryResult<bool>;
    fn mark_all_notifications_read(&self, user_id: UserId) -> RepositoryResult<usize>;
}

pub trait OfferReader {
    fn get_offer_by_id(&self, id: OfferId) -> RepositoryResult<Option<SpecialOffer>>;
    fn list_offers(&self, query: OfferListQuery) -> RepositoryResult<Vec<SpecialOffer>>;
    /// Approved offers live at `now`, best discount first.
    fn list_live_offers(&self, now: NaiveDateTime) -> RepositoryResult<Vec<SpecialOffer>>;
    fn find_live_offer_by_promo(
        &self,
        code: &PromoCode,
        now: NaiveDateTime,
    ) -> RepositoryResult<Option<SpecialOffer>>;
}

pub trait OfferWriter {
    fn create_offer(&self, offer: &NewSpecialOffer) -> RepositoryResult<SpecialOffer>;
    /// Replaces the offer content and sends it back to moderation.
    fn update_offer(
        &self,
        id: OfferId,
        offer: &NewSpecialOffer,
        image_version: i32,
    ) -> RepositoryResult<SpecialOffer>;
    fn moderate_offer(
        &self,
        id: OfferId,
        status: OfferStatus,
        note: Option<SafeText>,
    ) -> RepositoryResult<SpecialOffer>;
    fn delete_offer(&self, id: OfferId) -> RepositoryResult<()>;
}

pub trait DocumentReader {
    fn get_document_by_id(&self, id: DocumentId) -> RepositoryResult<Option<Document>>;
    fn list_documents(&self, patient_id: UserId) -> RepositoryResult<Vec<Document>>;
}

pub trait DocumentWriter {
    fn create_document(&self, document: &NewDocument) -> RepositoryResult<Document>;
    fn delete_document(&self, id: DocumentId) -> RepositoryResult<()>;
}

pub trait DentalChartReader {
    fn get_dental_chart(&self, patient_id: UserId) -> RepositoryResult<Option<DentalChart>>;
}

pub trait DentalChartWriter {
    fn save_dental_chart(
        &self,
        patient_id: UserId,
        teeth: &ChartTeeth,
    ) -> RepositoryResult<DentalChart>;
}

/// Server-side quote wizard snapshots keyed by the token kept in the session.
pub trait QuoteDraftReader {
    fn get_quote_draft(&self, token: &str) -> RepositoryResult<Option<String>>;
}

pub trait QuoteDraftWriter {
    fn save_quote_draft(&self, token: &str, snapshot: &str) -> RepositoryResult<()>;
    fn delete_quote_draft(&self, token: &str) -> RepositoryResult<()>;
    /// Removes drafts untouched since `cutoff`, returning how many were dropped.
    fn delete_quote_drafts_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<usize>;
}

pub trait StatsReader {
    fn dashboard_stats(&self) -> RepositoryResult<DashboardStats>;
}
