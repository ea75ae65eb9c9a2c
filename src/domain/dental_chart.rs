//! Per-patient dental chart keyed by FDI tooth number.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{TypeConstraintError, UserId};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToothCondition {
    Healthy,
    Missing,
    Filled,
    Crown,
    Implant,
    RootCanal,
    Decayed,
    Bridge,
}

/// FDI two-digit tooth number: quadrant 1-4, position 1-8.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothNumber(u8);

impl ToothNumber {
    pub fn new(value: u8) -> Result<Self, TypeConstraintError> {
        let quadrant = value / 10;
        let position = value % 10;
        if (1..=4).contains(&quadrant) && (1..=8).contains(&position) {
            Ok(Self(value))
        } else {
            Err(TypeConstraintError::InvalidValue(format!(
                "{value} is not an FDI tooth number"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All 32 permanent teeth in chart order.
    pub fn all() -> impl Iterator<Item = ToothNumber> {
        (1..=4u8).flat_map(|q| (1..=8u8).map(move |p| ToothNumber(q * 10 + p)))
    }
}

impl TryFrom<u8> for ToothNumber {
    type Error = TypeConstraintError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ToothNumber> for u8 {
    fn from(value: ToothNumber) -> Self {
        value.0
    }
}

pub type ChartTeeth = BTreeMap<ToothNumber, ToothCondition>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DentalChart {
    pub patient_id: UserId,
    pub teeth: ChartTeeth,
    pub updated_at: Option<NaiveDateTime>,
}

impl DentalChart {
    pub fn empty(patient_id: UserId) -> Self {
        Self {
            patient_id,
            teeth: ChartTeeth::new(),
            updated_at: None,
        }
    }
}

/// Parses a `{"16": "crown", ...}` map, rejecting unknown teeth.
pub fn parse_teeth(raw: &BTreeMap<String, ToothCondition>) -> Result<ChartTeeth, TypeConstraintError> {
    raw.iter()
        .map(|(tooth, condition)| {
            let number: u8 = tooth.trim().parse().map_err(|_| {
                TypeConstraintError::InvalidValue(format!("{tooth} is not an FDI tooth number"))
            })?;
            Ok((ToothNumber::new(number)?, *condition))
        })
        .collect()
}
