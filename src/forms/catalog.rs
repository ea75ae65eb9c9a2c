//! Treatment catalog, clinic price and package forms.

use std::io::Read;

use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use serde::Deserialize;
use validator::Validate;

use crate::domain::package::{NewPackage, PackageItem};
use crate::domain::treatment::{NewTreatment, UpdateTreatment};
use crate::domain::types::{
    CategoryName, ClinicId, Money, SafeText, Title, TreatmentId, TreatmentName,
};
use crate::forms::FormError;

#[derive(Debug, Deserialize, Validate)]
pub struct TreatmentForm {
    #[validate(length(min = 1, max = 40))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    /// Pounds, e.g. `450` or `450.50`.
    pub base_price: String,
    pub description: Option<String>,
}

impl TreatmentForm {
    pub fn to_new_treatment(&self) -> Result<NewTreatment, FormError> {
        Ok(NewTreatment::try_new(
            &self.code,
            TreatmentName::new(self.name.as_str())?,
            CategoryName::new(self.category.as_str())?,
            Money::parse_pounds(&self.base_price)?,
            SafeText::optional(self.description.clone())?,
        )?)
    }

    pub fn to_update_treatment(&self) -> Result<UpdateTreatment, FormError> {
        let new = self.to_new_treatment()?;
        Ok(UpdateTreatment {
            name: new.name,
            category: new.category,
            base_price: new.base_price,
            description: new.description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ClinicPriceForm {
    pub treatment_id: i32,
    /// Blank removes the override.
    pub price: Option<String>,
}

impl ClinicPriceForm {
    pub fn price(&self) -> Result<Option<Money>, FormError> {
        match super::non_blank(&self.price) {
            Some(raw) => Ok(Some(Money::parse_pounds(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Package editor; `treatment_id` and `quantity` are parallel repeated fields.
#[derive(Debug, Deserialize, Validate)]
pub struct PackageForm {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    #[validate(range(min = 0, max = 30))]
    #[serde(default)]
    pub hotel_nights: i32,
    #[serde(default)]
    pub treatment_id: Vec<i32>,
    #[serde(default)]
    pub quantity: Vec<i32>,
}

impl PackageForm {
    pub fn to_new_package(&self, clinic_id: ClinicId) -> Result<NewPackage, FormError> {
        let items = self
            .treatment_id
            .iter()
            .zip(self.quantity.iter())
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(treatment_id, quantity)| {
                Ok(PackageItem {
                    treatment_id: TreatmentId::new(*treatment_id)?,
                    quantity: *quantity,
                })
            })
            .collect::<Result<Vec<_>, FormError>>()?;
        Ok(NewPackage::try_new(
            clinic_id,
            Title::new(self.name.as_str())?,
            SafeText::optional(self.description.clone())?,
            Money::parse_pounds(&self.price)?,
            self.hotel_nights,
            items,
        )?)
    }
}

#[derive(MultipartForm)]
pub struct UploadTreatmentsForm {
    #[multipart(limit = "10MB")]
    pub csv: TempFile,
}

impl UploadTreatmentsForm {
    /// Reads the uploaded file as `code,name,category,base_price[,description]`.
    pub fn parse(&mut self) -> Result<Vec<NewTreatment>, FormError> {
        let mut raw = String::new();
        self.csv.file.read_to_string(&mut raw)?;
        parse_treatments_csv(&raw)
    }
}

/// Parses a treatment catalog CSV with a header row.
///
/// Column order is fixed; the description column is optional.
pub fn parse_treatments_csv(raw: &str) -> Result<Vec<NewTreatment>, FormError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut treatments = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| FormError::Csv(err.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row_error = |reason: String| FormError::CsvRow { line, reason };

        let field = |index: usize| record.get(index).unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 4 {
            return Err(row_error("expected at least 4 columns".to_string()));
        }

        let description = match field(4) {
            "" => None,
            text => Some(SafeText::new(text).map_err(|e| row_error(e.to_string()))?),
        };
        let treatment = NewTreatment::try_new(
            field(0),
            TreatmentName::new(field(1)).map_err(|e| row_error(e.to_string()))?,
            CategoryName::new(field(2)).map_err(|e| row_error(e.to_string()))?,
            Money::parse_pounds(field(3)).map_err(|e| row_error(e.to_string()))?,
            description,
        )
        .map_err(|e| row_error(e.to_string()))?;
        treatments.push(treatment);
    }
    Ok(treatments)
}
