//! Clinic special offers moderated by admins and shown on the homepage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ClinicId, ImageUrl, OfferId, PromoCode, SafeText, Title, TypeConstraintError, ensure_range,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Approved,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Approved => "approved",
            OfferStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for OfferStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(OfferStatus::Pending),
            "approved" => Ok(OfferStatus::Approved),
            "rejected" => Ok(OfferStatus::Rejected),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown offer status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpecialOffer {
    pub id: OfferId,
    pub clinic_id: ClinicId,
    pub title: Title,
    pub description: Option<SafeText>,
    pub discount_percent: i32,
    pub promo_code: Option<PromoCode>,
    pub image_url: Option<ImageUrl>,
    pub image_version: i32,
    pub status: OfferStatus,
    pub admin_note: Option<SafeText>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SpecialOffer {
    /// Approved and inside `[starts_at, ends_at)`.
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.status == OfferStatus::Approved && self.starts_at <= now && now < self.ends_at
    }

    /// Image URL carrying the current `v=` version parameter.
    pub fn display_image_url(&self) -> Option<String> {
        self.image_url
            .as_ref()
            .map(|url| cache_busted_url(url.as_str(), self.image_version))
    }
}

/// Offer payload submitted by a clinic; also used for edits.
#[derive(Clone, Debug)]
pub struct NewSpecialOffer {
    pub clinic_id: ClinicId,
    pub title: Title,
    pub description: Option<SafeText>,
    pub discount_percent: i32,
    pub promo_code: Option<PromoCode>,
    pub image_url: Option<ImageUrl>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

impl NewSpecialOffer {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        clinic_id: ClinicId,
        title: Title,
        description: Option<SafeText>,
        discount_percent: i32,
        promo_code: Option<PromoCode>,
        image_url: Option<ImageUrl>,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("discount", i64::from(discount_percent), 1, 90)?;
        if ends_at <= starts_at {
            return Err(TypeConstraintError::InvalidValue(
                "offer must end after it starts".to_string(),
            ));
        }
        Ok(Self {
            clinic_id,
            title,
            description,
            discount_percent,
            promo_code,
            image_url,
            starts_at,
            ends_at,
        })
    }

    /// Whether saving this payload over `existing` changes the image.
    pub fn changes_image(&self, existing: &SpecialOffer) -> bool {
        self.image_url != existing.image_url
    }
}

/// Appends `v=<version>` to `url`, replacing any existing `v` parameter.
///
/// Fragments are preserved after the query string.
pub fn cache_busted_url(url: &str, version: i32) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    let mut params: Vec<&str> = query
        .split('&')
        .filter(|param| !param.is_empty() && *param != "v" && !param.starts_with("v="))
        .collect();
    let version_param = format!("v={version}");
    params.push(&version_param);

    let mut busted = format!("{path}?{}", params.join("&"));
    if let Some(fragment) = fragment {
        busted.push('#');
        busted.push_str(fragment);
    }
    busted
}
