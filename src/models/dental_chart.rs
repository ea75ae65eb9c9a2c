use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::dental_chart::{ChartTeeth, DentalChart as DomainDentalChart};
use crate::domain::types::{TypeConstraintError, UserId};

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::dental_charts)]
#[diesel(primary_key(patient_id))]
/// Chart stored as a JSON object keyed by FDI tooth number.
pub struct DentalChart {
    pub patient_id: i32,
    pub chart: String,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<DentalChart> for DomainDentalChart {
    type Error = TypeConstraintError;

    fn try_from(row: DentalChart) -> Result<Self, Self::Error> {
        let teeth: ChartTeeth = serde_json::from_str(&row.chart)
            .map_err(|e| TypeConstraintError::InvalidValue(format!("corrupt dental chart: {e}")))?;
        Ok(Self {
            patient_id: UserId::new(row.patient_id)?,
            teeth,
            updated_at: Some(row.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dental_chart::{ToothCondition, ToothNumber};
    use chrono::Utc;

    #[test]
    fn stored_json_round_trips_into_domain() {
        let row = DentalChart {
            patient_id: 4,
            chart: r#"{"11":"implant","46":"filled"}"#.into(),
            updated_at: Utc::now().naive_utc(),
        };
        let chart = DomainDentalChart::try_from(row).unwrap();
        assert_eq!(
            chart.teeth.get(&ToothNumber::new(11).unwrap()),
            Some(&ToothCondition::Implant)
        );
    }

    #[test]
    fn invalid_tooth_in_storage_is_reported() {
        let row = DentalChart {
            patient_id: 4,
            chart: r#"{"99":"implant"}"#.into(),
            updated_at: Utc::now().naive_utc(),
        };
        assert!(DomainDentalChart::try_from(row).is_err());
    }
}
