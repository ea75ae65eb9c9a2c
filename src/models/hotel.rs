use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::hotel::{
    Hotel as DomainHotel, HotelBooking as DomainHotelBooking, HotelBookingStatus,
    NewHotel as DomainNewHotel, NewHotelBooking as DomainNewHotelBooking,
};
use crate::domain::types::{
    BookingId, CityName, HotelBookingId, HotelId, Money, Title, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::hotels)]
pub struct Hotel {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub stars: i32,
    pub nightly_price: i64,
    pub active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::hotels)]
pub struct NewHotel<'a> {
    pub name: &'a str,
    pub city: &'a str,
    pub stars: i32,
    pub nightly_price: i64,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::hotel_bookings)]
pub struct HotelBooking {
    pub id: i32,
    pub booking_id: i32,
    pub hotel_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::hotel_bookings)]
pub struct NewHotelBooking<'a> {
    pub booking_id: i32,
    pub hotel_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total: i64,
    pub status: &'a str,
}

impl TryFrom<Hotel> for DomainHotel {
    type Error = TypeConstraintError;

    fn try_from(hotel: Hotel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HotelId::new(hotel.id)?,
            name: Title::new(hotel.name)?,
            city: CityName::new(hotel.city)?,
            stars: hotel.stars,
            nightly_price: Money::from_pence(hotel.nightly_price)?,
            active: hotel.active,
        })
    }
}

impl<'a> From<&'a DomainNewHotel> for NewHotel<'a> {
    fn from(hotel: &'a DomainNewHotel) -> Self {
        Self {
            name: hotel.name.as_str(),
            city: hotel.city.as_str(),
            stars: hotel.stars,
            nightly_price: hotel.nightly_price.pence(),
        }
    }
}

impl TryFrom<HotelBooking> for DomainHotelBooking {
    type Error = TypeConstraintError;

    fn try_from(stay: HotelBooking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HotelBookingId::new(stay.id)?,
            booking_id: BookingId::new(stay.booking_id)?,
            hotel_id: HotelId::new(stay.hotel_id)?,
            check_in: stay.check_in,
            check_out: stay.check_out,
            guests: stay.guests,
            total: Money::from_pence(stay.total)?,
            status: HotelBookingStatus::try_from(stay.status.as_str())?,
            created_at: stay.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewHotelBooking> for NewHotelBooking<'a> {
    fn from(stay: &'a DomainNewHotelBooking) -> Self {
        Self {
            booking_id: stay.booking_id.get(),
            hotel_id: stay.hotel_id.get(),
            check_in: stay.check_in,
            check_out: stay.check_out,
            guests: stay.guests,
            total: stay.total.pence(),
            status: HotelBookingStatus::Requested.as_str(),
        }
    }
}
