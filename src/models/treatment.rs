use diesel::prelude::*;

use crate::domain::treatment::{
    NewTreatment as DomainNewTreatment, Treatment as DomainTreatment,
    UpdateTreatment as DomainUpdateTreatment,
};
use crate::domain::types::{
    CategoryName, Money, SafeText, TreatmentId, TreatmentName, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::treatments)]
/// Diesel model for [`crate::domain::treatment::Treatment`].
pub struct Treatment {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub category: String,
    pub base_price: i64,
    pub description: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::treatments, treat_none_as_null = true)]
pub struct NewTreatment<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub base_price: i64,
    pub description: Option<&'a str>,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::treatments, treat_none_as_null = true)]
pub struct UpdateTreatment<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub base_price: i64,
    pub description: Option<&'a str>,
}

impl TryFrom<Treatment> for DomainTreatment {
    type Error = TypeConstraintError;

    fn try_from(treatment: Treatment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TreatmentId::new(treatment.id)?,
            code: treatment.code,
            name: TreatmentName::new(treatment.name)?,
            category: CategoryName::new(treatment.category)?,
            base_price: Money::from_pence(treatment.base_price)?,
            description: SafeText::optional(treatment.description)?,
        })
    }
}

impl<'a> From<&'a DomainNewTreatment> for NewTreatment<'a> {
    fn from(treatment: &'a DomainNewTreatment) -> Self {
        Self {
            code: treatment.code.as_str(),
            name: treatment.name.as_str(),
            category: treatment.category.as_str(),
            base_price: treatment.base_price.pence(),
            description: treatment.description.as_ref().map(SafeText::as_str),
        }
    }
}

impl<'a> From<&'a DomainUpdateTreatment> for UpdateTreatment<'a> {
    fn from(treatment: &'a DomainUpdateTreatment) -> Self {
        Self {
            name: treatment.name.as_str(),
            category: treatment.category.as_str(),
            base_price: treatment.base_price.pence(),
            description: treatment.description.as_ref().map(SafeText::as_str),
        }
    }
}
