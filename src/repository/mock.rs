//! Mock repository implementations for isolating services in tests.

use chrono::NaiveDateTime;
use mockall::mock;

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
    NotificationId, OfferId, PackageId, PaymentId, PlanId, PlanLineId, PromoCode, QuoteId,
    SafeText, TreatmentId, UserId,
};
use crate::domain::user::{NewUser, User};
use crate::repository::errors::RepositoryResult;
use crate::repository::{
    BookingListQuery, BookingReader, BookingWriter, ClinicListQuery, ClinicReader, ClinicWriter,
    DashboardStats, DentalChartReader, DentalChartWriter, DocumentReader, DocumentWriter,
    HotelReader, HotelWriter, MessageReader, MessageWriter, NotificationReader,
    NotificationWriter, OfferListQuery, OfferReader, OfferWriter, PackageListQuery, PackageReader,
    PackageWriter, PlanReader, PlanWriter, QuoteDraftReader, QuoteDraftWriter, QuoteListQuery,
    QuoteReader, QuoteWriter, StatsReader, TreatmentReader, TreatmentWriter, UserReader,
    UserWriter,
};

mock! {
    pub Repository {}

    impl UserReader for Repository {
        fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
        fn get_user_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;
        fn list_users(&self, portal: Option<Portal>) -> RepositoryResult<Vec<User>>;
    }

    impl UserWriter for Repository {
        fn upsert_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
    }

    impl ClinicReader for Repository {
        fn get_clinic_by_id(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>>;
        fn get_clinic_by_slug(&self, slug: &str) -> RepositoryResult<Option<Clinic>>;
        fn list_clinics(&self, query: ClinicListQuery) -> RepositoryResult<(usize, Vec<Clinic>)>;
        fn list_clinics_for_staff(&self, user_id: UserId) -> RepositoryResult<Vec<Clinic>>;
        fn list_clinic_staff(&self, clinic_id: ClinicId) -> RepositoryResult<Vec<User>>;
        fn list_clinic_prices(
            &self,
            clinic_id: ClinicId,
        ) -> RepositoryResult<Vec<ClinicTreatmentPrice>>;
        fn list_prices_for_treatments(
            &self,
            treatment_ids: &[TreatmentId],
        ) -> RepositoryResult<Vec<ClinicTreatmentPrice>>;
    }

    impl ClinicWriter for Repository {
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

    impl TreatmentReader for Repository {
        fn get_treatment_by_id(&self, id: TreatmentId) -> RepositoryResult<Option<Treatment>>;
        fn get_treatments_by_ids(&self, ids: &[TreatmentId]) -> RepositoryResult<Vec<Treatment>>;
        fn list_treatments(&self, category: Option<String>) -> RepositoryResult<Vec<Treatment>>;
        fn list_treatment_categories(&self) -> RepositoryResult<Vec<String>>;
    }

    impl TreatmentWriter for Repository {
        fn create_treatment(&self, new_treatment: &NewTreatment) -> RepositoryResult<Treatment>;
        fn update_treatment(
            &self,
            id: TreatmentId,
            updates: &UpdateTreatment,
        ) -> RepositoryResult<Treatment>;
        fn upsert_treatments(&self, treatments: &[NewTreatment]) -> RepositoryResult<usize>;
    }

    impl PackageReader for Repository {
        fn get_package_by_id(&self, id: PackageId) -> RepositoryResult<Option<TreatmentPackage>>;
        fn list_packages(&self, query: PackageListQuery) -> RepositoryResult<Vec<TreatmentPackage>>;
    }

    impl PackageWriter for Repository {
        fn create_package(&self, new_package: &NewPackage) -> RepositoryResult<TreatmentPackage>;
        fn update_package(
            &self,
            id: PackageId,
            updates: &NewPackage,
        ) -> RepositoryResult<TreatmentPackage>;
        fn set_package_active(&self, id: PackageId, active: bool) -> RepositoryResult<()>;
    }

    impl QuoteReader for Repository {
        fn get_quote_by_id(&self, id: QuoteId) -> RepositoryResult<Option<QuoteRequest>>;
        fn list_quotes(&self, query: QuoteListQuery) -> RepositoryResult<(usize, Vec<QuoteRequest>)>;
    }

    impl QuoteWriter for Repository {
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

    impl PlanReader for Repository {
        fn get_plan_by_id(&self, id: PlanId) -> RepositoryResult<Option<TreatmentPlan>>;
        fn list_plans_for_quote(&self, quote_id: QuoteId) -> RepositoryResult<Vec<TreatmentPlan>>;
        fn get_plan_line(&self, id: PlanLineId) -> RepositoryResult<Option<TreatmentPlanLine>>;
    }

    impl PlanWriter for Repository {
        fn create_plan(&self, new_plan: &NewTreatmentPlan) -> RepositoryResult<TreatmentPlan>;
        fn update_plan_status(
            &self,
            id: PlanId,
            status: PlanStatus,
        ) -> RepositoryResult<TreatmentPlan>;
        fn add_plan_line(
            &self,
            plan_id: PlanId,
            line: &NewPlanLine,
        ) -> RepositoryResult<TreatmentPlanLine>;
        fn update_plan_line(
            &self,
            id: PlanLineId,
            line: &NewPlanLine,
        ) -> RepositoryResult<TreatmentPlanLine>;
        fn delete_plan_line(&self, id: PlanLineId) -> RepositoryResult<()>;
        fn accept_plan(&self, id: PlanId, booking: &NewBooking) -> RepositoryResult<Booking>;
    }

    impl BookingReader for Repository {
        fn get_booking_by_id(&self, id: BookingId) -> RepositoryResult<Option<Booking>>;
        fn get_booking_by_reference(&self, reference: &str) -> RepositoryResult<Option<Booking>>;
        fn list_bookings(&self, query: BookingListQuery) -> RepositoryResult<(usize, Vec<Booking>)>;
        fn clinic_has_patient(
            &self,
            clinic_ids: &[ClinicId],
            patient_id: UserId,
        ) -> RepositoryResult<bool>;
        fn list_appointments(&self, booking_id: BookingId) -> RepositoryResult<Vec<Appointment>>;
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

    impl BookingWriter for Repository {
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

    impl HotelReader for Repository {
        fn get_hotel_by_id(&self, id: HotelId) -> RepositoryResult<Option<Hotel>>;
        fn list_hotels(
            &self,
            city: Option<CityName>,
            active_only: bool,
        ) -> RepositoryResult<Vec<Hotel>>;
        fn get_hotel_booking_by_id(
            &self,
            id: HotelBookingId,
        ) -> RepositoryResult<Option<HotelBooking>>;
        fn list_hotel_bookings(&self, booking_id: BookingId) -> RepositoryResult<Vec<HotelBooking>>;
        fn list_hotel_bookings_by_status(
            &self,
            status: Option<HotelBookingStatus>,
        ) -> RepositoryResult<Vec<HotelBooking>>;
    }

    impl HotelWriter for Repository {
        fn create_hotel(&self, hotel: &NewHotel) -> RepositoryResult<Hotel>;
        fn set_hotel_active(&self, id: HotelId, active: bool) -> RepositoryResult<()>;
        fn create_hotel_booking(&self, stay: &NewHotelBooking) -> RepositoryResult<HotelBooking>;
        fn update_hotel_booking_status(
            &self,
            id: HotelBookingId,
            status: HotelBookingStatus,
        ) -> RepositoryResult<HotelBooking>;
    }

    impl MessageReader for Repository {
        fn list_messages(&self, booking_id: BookingId) -> RepositoryResult<Vec<Message>>;
        fn count_unread_messages(&self, user_id: UserId) -> RepositoryResult<usize>;
    }

    impl MessageWriter for Repository {
        fn create_message(&self, message: &NewMessage) -> RepositoryResult<Message>;
        fn mark_messages_read(
            &self,
            booking_id: BookingId,
            reader: UserId,
            at: NaiveDateTime,
        ) -> RepositoryResult<usize>;
    }

    impl NotificationReader for Repository {
        fn list_notifications(
            &self,
            user_id: UserId,
            unread_only: bool,
            limit: i64,
        ) -> RepositoryResult<Vec<Notification>>;
        fn count_unread_notifications(&self, user_id: UserId) -> RepositoryResult<usize>;
    }

    impl NotificationWriter for Repository {
        fn create_notifications(&self, notifications: &[NewNotification]) -> RepositoryResult<usize>;
        fn mark_notification_read(
            &self,
            id: NotificationId,
            user_id: UserId,
        ) -> RepositoryResult<bool>;
        fn mark_all_notifications_read(&self, user_id: UserId) -> RepositoryResult<usize>;
    }

    impl OfferReader for Repository {
        fn get_offer_by_id(&self, id: OfferId) -> RepositoryResult<Option<SpecialOffer>>;
        fn list_offers(&self, query: OfferListQuery) -> RepositoryResult<Vec<SpecialOffer>>;
        fn list_live_offers(&self, now: NaiveDateTime) -> RepositoryResult<Vec<SpecialOffer>>;
        fn find_live_offer_by_promo(
            &self,
            code: &PromoCode,
            now: NaiveDateTime,
        ) -> RepositoryResult<Option<SpecialOffer>>;
    }

    impl OfferWriter for Repository {
        fn create_offer(&self, offer: &NewSpecialOffer) -> RepositoryResult<SpecialOffer>;
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

    impl DocumentReader for Repository {
        fn get_document_by_id(&self, id: DocumentId) -> RepositoryResult<Option<Document>>;
        fn list_documents(&self, patient_id: UserId) -> RepositoryResult<Vec<Document>>;
    }

    impl DocumentWriter for Repository {
        fn create_document(&self, document: &NewDocument) -> RepositoryResult<Document>;
        fn delete_document(&self, id: DocumentId) -> RepositoryResult<()>;
    }

    impl DentalChartReader for Repository {
        fn get_dental_chart(&self, patient_id: UserId) -> RepositoryResult<Option<DentalChart>>;
    }

    impl DentalChartWriter for Repository {
        fn save_dental_chart(
            &self,
            patient_id: UserId,
            teeth: &ChartTeeth,
        ) -> RepositoryResult<DentalChart>;
    }

    impl QuoteDraftReader for Repository {
        fn get_quote_draft(&self, token: &str) -> RepositoryResult<Option<String>>;
    }

    impl QuoteDraftWriter for Repository {
        fn save_quote_draft(&self, token: &str, snapshot: &str) -> RepositoryResult<()>;
        fn delete_quote_draft(&self, token: &str) -> RepositoryResult<()>;
        fn delete_quote_drafts_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<usize>;
    }

    impl StatsReader for Repository {
        fn dashboard_stats(&self) -> RepositoryResult<DashboardStats>;
    }
}
