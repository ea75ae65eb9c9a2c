//! Clinics listed on the marketplace.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CityName, ClinicId, ClinicName, SafeText, TypeConstraintError, ensure_range,
};

/// Rating is stored in tenths of a star (0..=50).
pub const MAX_RATING: i32 = 50;
pub const DEFAULT_PRICE_FACTOR: i32 = 100;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: ClinicId,
    pub name: ClinicName,
    pub slug: String,
    pub city: CityName,
    pub address: Option<String>,
    pub description: Option<SafeText>,
    pub rating: i32,
    /// Percentage applied to catalog base prices when no override exists.
    pub price_factor: i32,
    pub verified: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Clinic {
    /// Rating as stars with one decimal, e.g. `4.7`.
    pub fn stars(&self) -> f32 {
        self.rating as f32 / 10.0
    }
}

#[derive(Clone, Debug)]
pub struct NewClinic {
    pub name: ClinicName,
    pub slug: String,
    pub city: CityName,
    pub address: Option<String>,
    pub description: Option<SafeText>,
    pub rating: i32,
    pub price_factor: i32,
    pub verified: bool,
}

impl NewClinic {
    pub fn try_new(
        name: ClinicName,
        city: CityName,
        address: Option<String>,
        description: Option<SafeText>,
        rating: i32,
        price_factor: i32,
        verified: bool,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("rating", i64::from(rating), 0, i64::from(MAX_RATING))?;
        ensure_range("price factor", i64::from(price_factor), 1, 500)?;
        let slug = slugify(name.as_str());
        if slug.is_empty() {
            return Err(TypeConstraintError::InvalidValue(
                "clinic name must contain letters or digits".to_string(),
            ));
        }
        Ok(Self {
            name,
            slug,
            city,
            address: address
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            description,
            rating,
            price_factor,
            verified,
        })
    }
}

/// Full replacement of the editable clinic fields.
#[derive(Clone, Debug)]
pub struct UpdateClinic {
    pub name: ClinicName,
    pub city: CityName,
    pub address: Option<String>,
    pub description: Option<SafeText>,
    pub rating: i32,
    pub price_factor: i32,
    pub verified: bool,
}

impl From<NewClinic> for UpdateClinic {
    fn from(clinic: NewClinic) -> Self {
        Self {
            name: clinic.name,
            city: clinic.city,
            address: clinic.address,
            description: clinic.description,
            rating: clinic.rating,
            price_factor: clinic.price_factor,
            verified: clinic.verified,
        }
    }
}

/// URL slug: lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Smile Istanbul -- Şişli Clinic! "), "smile-istanbul-i-li-clinic");
        assert_eq!(slugify("DentGroup 2"), "dentgroup-2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn new_clinic_validates_ranges() {
        let name = ClinicName::new("Bosphorus Dental").unwrap();
        let city = CityName::new("Istanbul").unwrap();
        let clinic =
            NewClinic::try_new(name.clone(), city.clone(), Some("  ".into()), None, 47, 90, true)
                .unwrap();
        assert_eq!(clinic.slug, "bosphorus-dental");
        assert_eq!(clinic.address, None);

        assert!(NewClinic::try_new(name.clone(), city.clone(), None, None, 51, 100, false).is_err());
        assert!(NewClinic::try_new(name, city, None, None, 10, 0, false).is_err());
    }
}
