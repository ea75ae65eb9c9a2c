use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::clinic::{
    Clinic as DomainClinic, NewClinic as DomainNewClinic, UpdateClinic as DomainUpdateClinic,
};
use crate::domain::treatment::ClinicTreatmentPrice;
use crate::domain::types::{
    CityName, ClinicId, ClinicName, Money, SafeText, TreatmentId, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::clinics)]
/// Diesel model for [`crate::domain::clinic::Clinic`].
pub struct Clinic {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub rating: i32,
    pub price_factor: i32,
    pub verified: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::clinics)]
pub struct NewClinic<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub city: &'a str,
    pub address: Option<&'a str>,
    pub description: Option<&'a str>,
    pub rating: i32,
    pub price_factor: i32,
    pub verified: bool,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::clinics, treat_none_as_null = true)]
/// Slug is immutable once a clinic exists.
pub struct UpdateClinic<'a> {
    pub name: &'a str,
    pub city: &'a str,
    pub address: Option<&'a str>,
    pub description: Option<&'a str>,
    pub rating: i32,
    pub price_factor: i32,
    pub verified: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::clinic_staff)]
pub struct ClinicStaff {
    pub clinic_id: i32,
    pub user_id: i32,
}

#[derive(Debug, Clone, Insertable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::clinic_treatments)]
pub struct ClinicTreatment {
    pub clinic_id: i32,
    pub treatment_id: i32,
    pub price: i64,
}

impl TryFrom<Clinic> for DomainClinic {
    type Error = TypeConstraintError;

    fn try_from(clinic: Clinic) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ClinicId::new(clinic.id)?,
            name: ClinicName::new(clinic.name)?,
            slug: clinic.slug,
            city: CityName::new(clinic.city)?,
            address: clinic.address,
            description: SafeText::optional(clinic.description)?,
            rating: clinic.rating,
            price_factor: clinic.price_factor,
            verified: clinic.verified,
            created_at: clinic.created_at,
            updated_at: clinic.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewClinic> for NewClinic<'a> {
    fn from(clinic: &'a DomainNewClinic) -> Self {
        Self {
            name: clinic.name.as_str(),
            slug: clinic.slug.as_str(),
            city: clinic.city.as_str(),
            address: clinic.address.as_deref(),
            description: clinic.description.as_ref().map(SafeText::as_str),
            rating: clinic.rating,
            price_factor: clinic.price_factor,
            verified: clinic.verified,
        }
    }
}

impl<'a> UpdateClinic<'a> {
    pub fn new(clinic: &'a DomainUpdateClinic, updated_at: NaiveDateTime) -> Self {
        Self {
            name: clinic.name.as_str(),
            city: clinic.city.as_str(),
            address: clinic.address.as_deref(),
            description: clinic.description.as_ref().map(SafeText::as_str),
            rating: clinic.rating,
            price_factor: clinic.price_factor,
            verified: clinic.verified,
            updated_at,
        }
    }
}

impl TryFrom<ClinicTreatment> for ClinicTreatmentPrice {
    type Error = TypeConstraintError;

    fn try_from(row: ClinicTreatment) -> Result<Self, Self::Error> {
        Ok(Self {
            clinic_id: ClinicId::new(row.clinic_id)?,
            treatment_id: TreatmentId::new(row.treatment_id)?,
            price: Money::from_pence(row.price)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clinic_borrows_domain_values() {
        let domain = DomainNewClinic::try_new(
            ClinicName::new("Smile Istanbul").unwrap(),
            CityName::new("Istanbul").unwrap(),
            None,
            None,
            47,
            90,
            true,
        )
        .unwrap();
        let insertable = NewClinic::from(&domain);
        assert_eq!(insertable.slug, "smile-istanbul");
        assert_eq!(insertable.price_factor, 90);
        assert!(insertable.description.is_none());
    }

    #[test]
    fn negative_override_is_rejected() {
        let row = ClinicTreatment {
            clinic_id: 1,
            treatment_id: 1,
            price: -5,
        };
        assert!(ClinicTreatmentPrice::try_from(row).is_err());
    }
}
