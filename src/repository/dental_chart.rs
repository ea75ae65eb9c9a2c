//! Per-patient dental charts stored as JSON.

use chrono::Utc;
use diesel::prelude::*;

use crate::{
    domain::{
        dental_chart::{ChartTeeth, DentalChart},
        types::UserId,
    },
    models::dental_chart::DentalChart as DbDentalChart,
    repository::{
        DentalChartReader, DentalChartWriter, DieselRepository,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl DentalChartReader for DieselRepository {
    fn get_dental_chart(&self, patient_id: UserId) -> RepositoryResult<Option<DentalChart>> {
        use crate::schema::dental_charts;

        let mut conn = self.conn()?;
        let db_chart = dental_charts::table
            .find(patient_id.get())
            .first::<DbDentalChart>(&mut conn)
            .optional()?;

        Ok(db_chart.map(DentalChart::try_from).transpose()?)
    }
}

impl DentalChartWriter for DieselRepository {
    fn save_dental_chart(
        &self,
        patient_id: UserId,
        teeth: &ChartTeeth,
    ) -> RepositoryResult<DentalChart> {
        use crate::schema::dental_charts;

        let chart = serde_json::to_string(teeth)
            .map_err(|e| RepositoryError::ValidationError(format!("Serialization error: {e}")))?;
        let row = DbDentalChart {
            patient_id: patient_id.get(),
            chart,
            updated_at: Utc::now().naive_utc(),
        };

        let mut conn = self.conn()?;
        let db_chart = diesel::insert_into(dental_charts::table)
            .values(&row)
            .on_conflict(dental_charts::patient_id)
            .do_update()
            .set(&row)
            .get_result::<DbDentalChart>(&mut conn)?;

        Ok(DentalChart::try_from(db_chart)?)
    }
}
