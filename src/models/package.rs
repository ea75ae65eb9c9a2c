use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::package::{PackageItem as DomainPackageItem, TreatmentPackage};
use crate::domain::types::{
    ClinicId, Money, PackageId, SafeText, Title, TreatmentId, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::packages)]
pub struct Package {
    pub id: i32,
    pub clinic_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub hotel_nights: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::packages)]
pub struct NewPackage<'a> {
    pub clinic_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: i64,
    pub hotel_nights: i32,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::packages, treat_none_as_null = true)]
pub struct UpdatePackage<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: i64,
    pub hotel_nights: i32,
}

#[derive(Debug, Clone, Insertable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::package_items)]
#[diesel(belongs_to(Package, foreign_key = package_id))]
pub struct PackageItem {
    pub package_id: i32,
    pub treatment_id: i32,
    pub quantity: i32,
}

/// Assembles a package from its row and item rows.
pub fn package_into_domain(
    package: Package,
    items: Vec<PackageItem>,
) -> Result<TreatmentPackage, TypeConstraintError> {
    let items = items
        .into_iter()
        .map(|item| {
            Ok(DomainPackageItem {
                treatment_id: TreatmentId::new(item.treatment_id)?,
                quantity: item.quantity,
            })
        })
        .collect::<Result<Vec<_>, TypeConstraintError>>()?;
    Ok(TreatmentPackage {
        id: PackageId::new(package.id)?,
        clinic_id: ClinicId::new(package.clinic_id)?,
        name: Title::new(package.name)?,
        description: SafeText::optional(package.description)?,
        price: Money::from_pence(package.price)?,
        hotel_nights: package.hotel_nights,
        active: package.active,
        items,
        created_at: package.created_at,
    })
}
