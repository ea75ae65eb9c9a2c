//! Clinic special offers and their moderation.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::{
        special_offer::{NewSpecialOffer, OfferStatus, SpecialOffer},
        types::{OfferId, PromoCode, SafeText},
    },
    models::special_offer::{
        NewSpecialOffer as DbNewSpecialOffer, SpecialOffer as DbSpecialOffer,
        UpdateSpecialOffer as DbUpdateSpecialOffer,
    },
    repository::{
        DieselRepository, OfferListQuery, OfferReader, OfferWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_offers(rows: Vec<DbSpecialOffer>) -> RepositoryResult<Vec<SpecialOffer>> {
    Ok(rows
        .into_iter()
        .map(SpecialOffer::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

impl OfferReader for DieselRepository {
    fn get_offer_by_id(&self, id: OfferId) -> RepositoryResult<Option<SpecialOffer>> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let db_offer = special_offers::table
            .find(id.get())
            .first::<DbSpecialOffer>(&mut conn)
            .optional()?;

        Ok(db_offer.map(SpecialOffer::try_from).transpose()?)
    }

    fn list_offers(&self, query: OfferListQuery) -> RepositoryResult<Vec<SpecialOffer>> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let mut items = special_offers::table.into_boxed();
        if let Some(clinic_id) = query.clinic_id {
            items = items.filter(special_offers::clinic_id.eq(clinic_id.get()));
        }
        if let Some(status) = query.status {
            items = items.filter(special_offers::status.eq(status.as_str()));
        }
        let rows = items
            .order((special_offers::created_at.desc(), special_offers::id.desc()))
            .load::<DbSpecialOffer>(&mut conn)?;

        into_offers(rows)
    }

    fn list_live_offers(&self, now: NaiveDateTime) -> RepositoryResult<Vec<SpecialOffer>> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let rows = special_offers::table
            .filter(special_offers::status.eq(OfferStatus::Approved.as_str()))
            .filter(special_offers::starts_at.le(now))
            .filter(special_offers::ends_at.gt(now))
            .order((
                special_offers::discount_percent.desc(),
                special_offers::id.asc(),
            ))
            .load::<DbSpecialOffer>(&mut conn)?;

        into_offers(rows)
    }

    fn find_live_offer_by_promo(
        &self,
        code: &PromoCode,
        now: NaiveDateTime,
    ) -> RepositoryResult<Option<SpecialOffer>> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let db_offer = special_offers::table
            .filter(special_offers::promo_code.eq(code.as_str()))
            .filter(special_offers::status.eq(OfferStatus::Approved.as_str()))
            .filter(special_offers::starts_at.le(now))
            .filter(special_offers::ends_at.gt(now))
            .order((
                special_offers::discount_percent.desc(),
                special_offers::id.asc(),
            ))
            .first::<DbSpecialOffer>(&mut conn)
            .optional()?;

        Ok(db_offer.map(SpecialOffer::try_from).transpose()?)
    }
}

impl OfferWriter for DieselRepository {
    fn create_offer(&self, offer: &NewSpecialOffer) -> RepositoryResult<SpecialOffer> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let db_new_offer: DbNewSpecialOffer = offer.into();
        let db_offer = diesel::insert_into(special_offers::table)
            .values(&db_new_offer)
            .get_result::<DbSpecialOffer>(&mut conn)?;

        Ok(SpecialOffer::try_from(db_offer)?)
    }

    fn update_offer(
        &self,
        id: OfferId,
        offer: &NewSpecialOffer,
        image_version: i32,
    ) -> RepositoryResult<SpecialOffer> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let db_updates = DbUpdateSpecialOffer::new(offer, image_version, Utc::now().naive_utc());
        let db_offer = diesel::update(special_offers::table.find(id.get()))
            .set(&db_updates)
            .get_result::<DbSpecialOffer>(&mut conn)?;

        Ok(SpecialOffer::try_from(db_offer)?)
    }

    fn moderate_offer(
        &self,
        id: OfferId,
        status: OfferStatus,
        note: Option<SafeText>,
    ) -> RepositoryResult<SpecialOffer> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let db_offer = diesel::update(special_offers::table.find(id.get()))
            .set((
                special_offers::status.eq(status.as_str()),
                special_offers::admin_note.eq(note.map(SafeText::into_inner)),
                special_offers::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<DbSpecialOffer>(&mut conn)?;

        Ok(SpecialOffer::try_from(db_offer)?)
    }

    fn delete_offer(&self, id: OfferId) -> RepositoryResult<()> {
        use crate::schema::special_offers;

        let mut conn = self.conn()?;
        let affected = diesel::delete(special_offers::table.find(id.get())).execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
