//! Catalog, package and clinic comparison views.

use serde::Serialize;

use crate::domain::clinic::Clinic;
use crate::domain::package::TreatmentPackage;
use crate::domain::treatment::Treatment;
use crate::domain::types::{Money, TreatmentId};

#[derive(Debug, Clone, Serialize)]
pub struct TreatmentCatalog {
    pub treatments: Vec<Treatment>,
    pub categories: Vec<String>,
    pub selected_category: Option<String>,
}

/// A treatment as priced by one clinic.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedTreatment {
    pub treatment: Treatment,
    pub price: Money,
    pub uk_price: Money,
    /// Whether the clinic set an explicit price.
    pub has_override: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicDetail {
    pub clinic: Clinic,
    pub treatments: Vec<PricedTreatment>,
    pub packages: Vec<TreatmentPackage>,
}

/// Package with the price of its treatments bought separately.
#[derive(Debug, Clone, Serialize)]
pub struct PackageView {
    pub package: TreatmentPackage,
    pub clinic_name: String,
    pub separate_price: Money,
    pub savings: Money,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparedLine {
    pub treatment_id: TreatmentId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub total: Money,
}

/// One clinic's price for a basket of treatments.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicComparison {
    pub clinic: Clinic,
    pub lines: Vec<ComparedLine>,
    pub total: Money,
    pub uk_total: Money,
    pub savings_percent: u32,
}

/// Price list and packages a clinic maintains.
#[derive(Debug, Serialize)]
pub struct ClinicCatalogPage {
    pub clinic: Clinic,
    pub clinics: Vec<Clinic>,
    pub prices: Vec<PricedTreatment>,
    pub packages: Vec<PackageView>,
}
