use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::special_offer::{
    NewSpecialOffer as DomainNewSpecialOffer, OfferStatus, SpecialOffer as DomainSpecialOffer,
};
use crate::domain::types::{
    ClinicId, ImageUrl, OfferId, PromoCode, SafeText, Title, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::special_offers)]
/// Diesel model for [`crate::domain::special_offer::SpecialOffer`].
pub struct SpecialOffer {
    pub id: i32,
    pub clinic_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub promo_code: Option<String>,
    pub image_url: Option<String>,
    pub image_version: i32,
    pub status: String,
    pub admin_note: Option<String>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::special_offers)]
pub struct NewSpecialOffer<'a> {
    pub clinic_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub discount_percent: i32,
    pub promo_code: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub status: &'a str,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

/// Clinic edit: content changes send the offer back to moderation.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::special_offers, treat_none_as_null = true)]
pub struct UpdateSpecialOffer<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub discount_percent: i32,
    pub promo_code: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub image_version: i32,
    pub status: &'a str,
    pub admin_note: Option<&'a str>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SpecialOffer> for DomainSpecialOffer {
    type Error = TypeConstraintError;

    fn try_from(offer: SpecialOffer) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OfferId::new(offer.id)?,
            clinic_id: ClinicId::new(offer.clinic_id)?,
            title: Title::new(offer.title)?,
            description: SafeText::optional(offer.description)?,
            discount_percent: offer.discount_percent,
            promo_code: offer.promo_code.map(PromoCode::new).transpose()?,
            image_url: offer.image_url.map(ImageUrl::new).transpose()?,
            image_version: offer.image_version,
            status: OfferStatus::try_from(offer.status.as_str())?,
            admin_note: SafeText::optional(offer.admin_note)?,
            starts_at: offer.starts_at,
            ends_at: offer.ends_at,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewSpecialOffer> for NewSpecialOffer<'a> {
    fn from(offer: &'a DomainNewSpecialOffer) -> Self {
        Self {
            clinic_id: offer.clinic_id.get(),
            title: offer.title.as_str(),
            description: offer.description.as_ref().map(SafeText::as_str),
            discount_percent: offer.discount_percent,
            promo_code: offer.promo_code.as_ref().map(PromoCode::as_str),
            image_url: offer.image_url.as_ref().map(ImageUrl::as_str),
            status: OfferStatus::Pending.as_str(),
            starts_at: offer.starts_at,
            ends_at: offer.ends_at,
        }
    }
}

impl<'a> UpdateSpecialOffer<'a> {
    pub fn new(offer: &'a DomainNewSpecialOffer, image_version: i32, now: NaiveDateTime) -> Self {
        Self {
            title: offer.title.as_str(),
            description: offer.description.as_ref().map(SafeText::as_str),
            discount_percent: offer.discount_percent,
            promo_code: offer.promo_code.as_ref().map(PromoCode::as_str),
            image_url: offer.image_url.as_ref().map(ImageUrl::as_str),
            image_version,
            status: OfferStatus::Pending.as_str(),
            admin_note: None,
            starts_at: offer.starts_at,
            ends_at: offer.ends_at,
            updated_at: now,
        }
    }
}
