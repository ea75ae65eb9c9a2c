use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::special_offer::SpecialOffer;

/// Homepage carousel card with a cache-busted image URL.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OfferCard {
    pub id: i32,
    pub clinic_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub promo_code: Option<String>,
    pub image_url: Option<String>,
    pub ends_at: NaiveDateTime,
}

impl From<&SpecialOffer> for OfferCard {
    fn from(offer: &SpecialOffer) -> Self {
        Self {
            id: offer.id.get(),
            clinic_id: offer.clinic_id.get(),
            title: offer.title.as_str().to_string(),
            description: offer.description.as_ref().map(|d| d.as_str().to_string()),
            discount_percent: offer.discount_percent,
            promo_code: offer.promo_code.as_ref().map(|c| c.as_str().to_string()),
            image_url: offer.display_image_url(),
            ends_at: offer.ends_at,
        }
    }
}
