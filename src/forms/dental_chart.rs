use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::dental_chart::{ChartTeeth, ToothCondition, parse_teeth};
use crate::forms::FormError;

/// `{"teeth": {"16": "crown", "36": "root_canal"}}`
#[derive(Debug, Deserialize)]
pub struct DentalChartPayload {
    #[serde(default)]
    pub teeth: BTreeMap<String, ToothCondition>,
}

impl DentalChartPayload {
    pub fn teeth(&self) -> Result<ChartTeeth, FormError> {
        Ok(parse_teeth(&self.teeth)?)
    }
}
