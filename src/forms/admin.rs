//! Admin portal forms: clinics, staff and hotels.

use serde::Deserialize;
use validator::Validate;

use crate::domain::clinic::{DEFAULT_PRICE_FACTOR, NewClinic};
use crate::domain::hotel::NewHotel;
use crate::domain::types::{CityName, ClinicName, Money, SafeText, Title};
use crate::forms::{FormError, non_blank};

fn default_price_factor() -> i32 {
    DEFAULT_PRICE_FACTOR
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClinicForm {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    /// Tenths of a star.
    #[serde(default)]
    #[validate(range(min = 0, max = 50))]
    pub rating: i32,
    #[serde(default = "default_price_factor")]
    #[validate(range(min = 1, max = 500))]
    pub price_factor: i32,
    /// Checkbox; present when ticked.
    pub verified: Option<String>,
}

impl ClinicForm {
    pub fn to_new_clinic(&self) -> Result<NewClinic, FormError> {
        Ok(NewClinic::try_new(
            ClinicName::new(self.name.as_str())?,
            CityName::new(self.city.as_str())?,
            non_blank(&self.address),
            SafeText::optional(self.description.clone())?,
            self.rating,
            self.price_factor,
            self.verified.is_some(),
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct StaffForm {
    pub user_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HotelForm {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(range(min = 1, max = 5))]
    pub stars: i32,
    pub nightly_price: String,
}

impl HotelForm {
    pub fn to_new_hotel(&self) -> Result<NewHotel, FormError> {
        Ok(NewHotel::try_new(
            Title::new(self.name.as_str())?,
            CityName::new(self.city.as_str())?,
            self.stars,
            Money::parse_pounds(&self.nightly_price)?,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignClinicForm {
    pub clinic_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilterQuery {
    pub status: Option<String>,
    pub page: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unticked_checkbox_means_unverified() {
        let form = ClinicForm {
            name: "Smile Istanbul".into(),
            city: "Istanbul".into(),
            address: Some(" ".into()),
            description: None,
            rating: 47,
            price_factor: 90,
            verified: None,
        };
        let clinic = form.to_new_clinic().unwrap();
        assert!(!clinic.verified);
        assert!(clinic.address.is_none());
        assert_eq!(clinic.slug, "smile-istanbul");
    }
}
