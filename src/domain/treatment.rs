//! Treatment catalog and per-clinic pricing.

use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CategoryName, ClinicId, Money, SafeText, TreatmentId, TreatmentName, TypeConstraintError,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: TreatmentId,
    /// Upper-case catalog code, e.g. `IMPLANT-STD`.
    pub code: String,
    pub name: TreatmentName,
    pub category: CategoryName,
    pub base_price: Money,
    pub description: Option<SafeText>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewTreatment {
    pub code: String,
    pub name: TreatmentName,
    pub category: CategoryName,
    pub base_price: Money,
    pub description: Option<SafeText>,
}

impl NewTreatment {
    pub fn try_new(
        code: &str,
        name: TreatmentName,
        category: CategoryName,
        base_price: Money,
        description: Option<SafeText>,
    ) -> Result<Self, TypeConstraintError> {
        Ok(Self {
            code: normalize_code(code)?,
            name,
            category,
            base_price,
            description,
        })
    }
}

#[derive(Clone, Debug)]
pub struct UpdateTreatment {
    pub name: TreatmentName,
    pub category: CategoryName,
    pub base_price: Money,
    pub description: Option<SafeText>,
}

/// Clinic specific price overriding `base_price × price_factor`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClinicTreatmentPrice {
    pub clinic_id: ClinicId,
    pub treatment_id: TreatmentId,
    pub price: Money,
}

/// Catalog codes are upper-case ASCII alphanumerics and dashes.
pub fn normalize_code(code: &str) -> Result<String, TypeConstraintError> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(TypeConstraintError::EmptyString);
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TypeConstraintError::InvalidValue(format!(
            "invalid treatment code: {code}"
        )));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_upper_cased() {
        assert_eq!(normalize_code(" crown-zr ").unwrap(), "CROWN-ZR");
        assert!(normalize_code("crown zr").is_err());
        assert!(normalize_code("").is_err());
    }
}
