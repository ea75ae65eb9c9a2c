//! Special offer submission and moderation forms.

use serde::Deserialize;
use validator::Validate;

use crate::domain::special_offer::{NewSpecialOffer, OfferStatus};
use crate::domain::types::{ClinicId, ImageUrl, PromoCode, SafeText, Title};
use crate::forms::{FormError, non_blank, parse_datetime_local};

#[derive(Debug, Deserialize, Validate)]
pub struct OfferForm {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 90))]
    pub discount_percent: i32,
    pub promo_code: Option<String>,
    pub image_url: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
}

impl OfferForm {
    pub fn to_new_offer(&self, clinic_id: ClinicId) -> Result<NewSpecialOffer, FormError> {
        Ok(NewSpecialOffer::try_new(
            clinic_id,
            Title::new(self.title.as_str())?,
            SafeText::optional(self.description.clone())?,
            self.discount_percent,
            non_blank(&self.promo_code).map(PromoCode::new).transpose()?,
            non_blank(&self.image_url).map(ImageUrl::new).transpose()?,
            parse_datetime_local(&self.starts_at)?,
            parse_datetime_local(&self.ends_at)?,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct ModerateOfferForm {
    /// `approved` or `rejected`.
    pub status: String,
    pub note: Option<String>,
}

impl ModerateOfferForm {
    pub fn decision(&self) -> Result<(OfferStatus, Option<SafeText>), FormError> {
        let status = match OfferStatus::try_from(self.status.as_str()) {
            Ok(status @ (OfferStatus::Approved | OfferStatus::Rejected)) => status,
            _ => return Err(FormError::InvalidStatus(self.status.clone())),
        };
        Ok((status, SafeText::optional(self.note.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> OfferForm {
        OfferForm {
            title: "Winter implants".into(),
            description: Some("Two implants, one price".into()),
            discount_percent: 25,
            promo_code: Some("winter25".into()),
            image_url: Some("/assets/offers/winter.jpg".into()),
            starts_at: "2026-12-01T00:00".into(),
            ends_at: "2027-01-31T23:59".into(),
        }
    }

    #[test]
    fn offer_form_builds_payload() {
        let offer = form().to_new_offer(ClinicId::new(1).unwrap()).unwrap();
        assert_eq!(offer.promo_code.unwrap().as_str(), "WINTER25");
    }

    #[test]
    fn moderation_cannot_reset_to_pending() {
        let form = ModerateOfferForm {
            status: "pending".into(),
            note: None,
        };
        assert!(form.decision().is_err());
    }
}
