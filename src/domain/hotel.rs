//! Partner hotels and hotel stays attached to bookings.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    BookingId, CityName, HotelBookingId, HotelId, Money, Title, TypeConstraintError, ensure_range,
};

pub const MAX_NIGHTS: i64 = 30;
pub const MAX_GUESTS: i32 = 6;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Hotel {
    pub id: HotelId,
    pub name: Title,
    pub city: CityName,
    pub stars: i32,
    pub nightly_price: Money,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct NewHotel {
    pub name: Title,
    pub city: CityName,
    pub stars: i32,
    pub nightly_price: Money,
}

impl NewHotel {
    pub fn try_new(
        name: Title,
        city: CityName,
        stars: i32,
        nightly_price: Money,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("stars", i64::from(stars), 1, 5)?;
        Ok(Self {
            name,
            city,
            stars,
            nightly_price,
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HotelBookingStatus {
    Requested,
    Confirmed,
    Cancelled,
}

impl HotelBookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HotelBookingStatus::Requested => "requested",
            HotelBookingStatus::Confirmed => "confirmed",
            HotelBookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: HotelBookingStatus) -> bool {
        matches!(
            (self, next),
            (HotelBookingStatus::Requested, HotelBookingStatus::Confirmed)
                | (HotelBookingStatus::Requested, HotelBookingStatus::Cancelled)
                | (HotelBookingStatus::Confirmed, HotelBookingStatus::Cancelled)
        )
    }
}

impl TryFrom<&str> for HotelBookingStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "requested" => Ok(HotelBookingStatus::Requested),
            "confirmed" => Ok(HotelBookingStatus::Confirmed),
            "cancelled" => Ok(HotelBookingStatus::Cancelled),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown hotel booking status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HotelBooking {
    pub id: HotelBookingId,
    pub booking_id: BookingId,
    pub hotel_id: HotelId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total: Money,
    pub status: HotelBookingStatus,
    pub created_at: NaiveDateTime,
}

impl HotelBooking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Clone, Debug)]
pub struct NewHotelBooking {
    pub booking_id: BookingId,
    pub hotel_id: HotelId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total: Money,
}

impl NewHotelBooking {
    /// Validates the stay and prices it at `nights × nightly price`.
    pub fn try_new(
        booking_id: BookingId,
        hotel: &Hotel,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("guests", i64::from(guests), 1, i64::from(MAX_GUESTS))?;
        let nights = (check_out - check_in).num_days();
        ensure_range("nights", nights, 1, MAX_NIGHTS)?;
        // `nights` is bounded above so the cast cannot truncate.
        let total = hotel.nightly_price.times(nights as i32);
        Ok(Self {
            booking_id,
            hotel_id: hotel.id,
            check_in,
            check_out,
            guests,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel() -> Hotel {
        Hotel {
            id: HotelId::new(2).unwrap(),
            name: Title::new("Bosphorus View").unwrap(),
            city: CityName::new("Istanbul").unwrap(),
            stars: 4,
            nightly_price: Money::from_pounds(65),
            active: true,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    #[test]
    fn stay_is_priced_per_night() {
        let stay =
            NewHotelBooking::try_new(BookingId::new(1).unwrap(), &hotel(), day(3), day(8), 2)
                .unwrap();
        assert_eq!(stay.total, Money::from_pounds(325));
    }

    #[test]
    fn check_out_must_follow_check_in() {
        let booking = BookingId::new(1).unwrap();
        assert!(NewHotelBooking::try_new(booking, &hotel(), day(8), day(8), 1).is_err());
        assert!(NewHotelBooking::try_new(booking, &hotel(), day(8), day(3), 1).is_err());
    }

    #[test]
    fn guests_are_bounded() {
        let booking = BookingId::new(1).unwrap();
        assert!(NewHotelBooking::try_new(booking, &hotel(), day(1), day(2), 0).is_err());
        assert!(NewHotelBooking::try_new(booking, &hotel(), day(1), day(2), 7).is_err());
    }

    #[test]
    fn stars_are_bounded() {
        let name = Title::new("Inn").unwrap();
        let city = CityName::new("Istanbul").unwrap();
        assert!(NewHotel::try_new(name, city, 6, Money::ZERO).is_err());
    }
}
