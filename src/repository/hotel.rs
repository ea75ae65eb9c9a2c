//! Partner hotels and stays attached to bookings.

use diesel::prelude::*;

use crate::{
    domain::{
        hotel::{Hotel, HotelBooking, HotelBookingStatus, NewHotel, NewHotelBooking},
        types::{BookingId, CityName, HotelBookingId, HotelId},
    },
    models::hotel::{
        Hotel as DbHotel, HotelBooking as DbHotelBooking, NewHotel as DbNewHotel,
        NewHotelBooking as DbNewHotelBooking,
    },
    repository::{
        DieselRepository, HotelReader, HotelWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_stays(rows: Vec<DbHotelBooking>) -> RepositoryResult<Vec<HotelBooking>> {
    Ok(rows
        .into_iter()
        .map(HotelBooking::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

impl HotelReader for DieselRepository {
    fn get_hotel_by_id(&self, id: HotelId) -> RepositoryResult<Option<Hotel>> {
        use crate::schema::hotels;

        let mut conn = self.conn()?;
        let db_hotel = hotels::table
            .find(id.get())
            .first::<DbHotel>(&mut conn)
            .optional()?;

        Ok(db_hotel.map(Hotel::try_from).transpose()?)
    }

    fn list_hotels(
        &self,
        city: Option<CityName>,
        active_only: bool,
    ) -> RepositoryResult<Vec<Hotel>> {
        use crate::schema::hotels;

        let mut conn = self.conn()?;
        let mut query = hotels::table.into_boxed();
        if let Some(city) = city {
            query = query.filter(hotels::city.eq(city.into_inner()));
        }
        if active_only {
            query = query.filter(hotels::active.eq(true));
        }
        let hotels = query
            .order((hotels::stars.desc(), hotels::name.asc()))
            .load::<DbHotel>(&mut conn)?
            .into_iter()
            .map(Hotel::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hotels)
    }

    fn get_hotel_booking_by_id(
        &self,
        id: HotelBookingId,
    ) -> RepositoryResult<Option<HotelBooking>> {
        use crate::schema::hotel_bookings;

        let mut conn = self.conn()?;
        let stay = hotel_bookings::table
            .find(id.get())
            .first::<DbHotelBooking>(&mut conn)
            .optional()?;

        Ok(stay.map(HotelBooking::try_from).transpose()?)
    }

    fn list_hotel_bookings(&self, booking_id: BookingId) -> RepositoryResult<Vec<HotelBooking>> {
        use crate::schema::hotel_bookings;

        let mut conn = self.conn()?;
        let rows = hotel_bookings::table
            .filter(hotel_bookings::booking_id.eq(booking_id.get()))
            .order(hotel_bookings::check_in.asc())
            .load::<DbHotelBooking>(&mut conn)?;

        into_stays(rows)
    }

    fn list_hotel_bookings_by_status(
        &self,
        status: Option<HotelBookingStatus>,
    ) -> RepositoryResult<Vec<HotelBooking>> {
        use crate::schema::hotel_bookings;

        let mut conn = self.conn()?;
        let mut query = hotel_bookings::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(hotel_bookings::status.eq(status.as_str()));
        }
        let rows = query
            .order(hotel_bookings::check_in.asc())
            .load::<DbHotelBooking>(&mut conn)?;

        into_stays(rows)
    }
}

impl HotelWriter for DieselRepository {
    fn create_hotel(&self, hotel: &NewHotel) -> RepositoryResult<Hotel> {
        use crate::schema::hotels;

        let mut conn = self.conn()?;
        let db_new_hotel: DbNewHotel = hotel.into();
        let db_hotel = diesel::insert_into(hotels::table)
            .values(&db_new_hotel)
            .get_result::<DbHotel>(&mut conn)?;

        Ok(Hotel::try_from(db_hotel)?)
    }

    fn set_hotel_active(&self, id: HotelId, active: bool) -> RepositoryResult<()> {
        use crate::schema::hotels;

        let mut conn = self.conn()?;
        let affected = diesel::update(hotels::table.find(id.get()))
            .set(hotels::active.eq(active))
            .execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn create_hotel_booking(&self, stay: &NewHotelBooking) -> RepositoryResult<HotelBooking> {
        use crate::schema::hotel_bookings;

        let mut conn = self.conn()?;
        let db_new_stay: DbNewHotelBooking = stay.into();
        let db_stay = diesel::insert_into(hotel_bookings::table)
            .values(&db_new_stay)
            .get_result::<DbHotelBooking>(&mut conn)?;

        Ok(HotelBooking::try_from(db_stay)?)
    }

    fn update_hotel_booking_status(
        &self,
        id: HotelBookingId,
        status: HotelBookingStatus,
    ) -> RepositoryResult<HotelBooking> {
        use crate::schema::hotel_bookings;

        let mut conn = self.conn()?;
        let db_stay = diesel::update(hotel_bookings::table.find(id.get()))
            .set(hotel_bookings::status.eq(status.as_str()))
            .get_result::<DbHotelBooking>(&mut conn)?;

        Ok(HotelBooking::try_from(db_stay)?)
    }
}
