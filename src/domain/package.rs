//! Clinic treatment packages: bundles of treatments and hotel nights sold at a single price.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ClinicId, Money, PackageId, SafeText, Title, TreatmentId, TypeConstraintError, ensure_range,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PackageItem {
    pub treatment_id: TreatmentId,
    pub quantity: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPackage {
    pub id: PackageId,
    pub clinic_id: ClinicId,
    pub name: Title,
    pub description: Option<SafeText>,
    pub price: Money,
    pub hotel_nights: i32,
    pub active: bool,
    pub items: Vec<PackageItem>,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewPackage {
    pub clinic_id: ClinicId,
    pub name: Title,
    pub description: Option<SafeText>,
    pub price: Money,
    pub hotel_nights: i32,
    pub items: Vec<PackageItem>,
}

impl NewPackage {
    pub fn try_new(
        clinic_id: ClinicId,
        name: Title,
        description: Option<SafeText>,
        price: Money,
        hotel_nights: i32,
        items: Vec<PackageItem>,
    ) -> Result<Self, TypeConstraintError> {
        ensure_range("hotel nights", i64::from(hotel_nights), 0, 30)?;
        if items.is_empty() {
            return Err(TypeConstraintError::InvalidValue(
                "a package needs at least one treatment".to_string(),
            ));
        }
        let mut merged: Vec<PackageItem> = Vec::with_capacity(items.len());
        for item in items {
            ensure_range("quantity", i64::from(item.quantity), 1, 32)?;
            match merged
                .iter_mut()
                .find(|existing| existing.treatment_id == item.treatment_id)
            {
                Some(existing) => {
                    existing.quantity += item.quantity;
                    ensure_range("quantity", i64::from(existing.quantity), 1, 32)?;
                }
                None => merged.push(item),
            }
        }
        Ok(Self {
            clinic_id,
            name,
            description,
            price,
            hotel_nights,
            items: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_items_are_merged() {
        let treatment = TreatmentId::new(3).unwrap();
        let package = NewPackage::try_new(
            ClinicId::new(1).unwrap(),
            Title::new("Hollywood smile").unwrap(),
            None,
            Money::from_pounds(2500),
            5,
            vec![
                PackageItem {
                    treatment_id: treatment,
                    quantity: 8,
                },
                PackageItem {
                    treatment_id: treatment,
                    quantity: 2,
                },
            ],
        )
        .unwrap();
        assert_eq!(package.items.len(), 1);
        assert_eq!(package.items[0].quantity, 10);
    }

    #[test]
    fn empty_package_is_rejected() {
        let result = NewPackage::try_new(
            ClinicId::new(1).unwrap(),
            Title::new("Nothing").unwrap(),
            None,
            Money::ZERO,
            0,
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn merged_quantity_is_capped() {
        let treatment = TreatmentId::new(3).unwrap();
        let item = |quantity| PackageItem {
            treatment_id: treatment,
            quantity,
        };
        let result = NewPackage::try_new(
            ClinicId::new(1).unwrap(),
            Title::new("Full arch").unwrap(),
            None,
            Money::from_pounds(4000),
            7,
            vec![item(30), item(3)],
        );
        assert!(result.is_err());
    }
}
