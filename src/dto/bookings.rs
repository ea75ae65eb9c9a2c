//! Booking detail views.

use serde::Serialize;

use crate::domain::booking::{Appointment, Booking, Payment};
use crate::domain::clinic::Clinic;
use crate::domain::hotel::{Hotel, HotelBooking};
use crate::domain::message::Message;
use crate::domain::treatment_plan::TreatmentPlan;
use crate::domain::types::Money;
use crate::pagination::Paginated;

/// How the viewer relates to a booking.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingViewer {
    Patient,
    Clinic,
    Admin,
}

#[derive(Debug, Serialize)]
pub struct BookingPageData {
    pub booking: Booking,
    pub clinic: Option<Clinic>,
    pub plan: Option<TreatmentPlan>,
    pub appointments: Vec<Appointment>,
    pub payments: Vec<Payment>,
    pub hotel_stays: Vec<HotelBooking>,
    pub hotels: Vec<Hotel>,
    pub messages: Vec<Message>,
    pub balance_due: Money,
    pub viewer: BookingViewer,
    /// Statuses the viewer may move the booking to.
    pub next_statuses: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BookingListPage {
    pub bookings: Paginated<Booking>,
    pub status_filter: Option<String>,
}
