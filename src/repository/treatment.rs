//! Treatment catalogue.

use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        treatment::{NewTreatment, Treatment, UpdateTreatment},
        types::TreatmentId,
    },
    models::treatment::{
        NewTreatment as DbNewTreatment, Treatment as DbTreatment,
        UpdateTreatment as DbUpdateTreatment,
    },
    repository::{DieselRepository, TreatmentReader, TreatmentWriter, errors::{RepositoryError, RepositoryResult}},
};

fn into_treatments(rows: Vec<DbTreatment>) -> RepositoryResult<Vec<Treatment>> {
    Ok(rows
        .into_iter()
        .map(Treatment::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

impl TreatmentReader for DieselRepository {
    fn get_treatment_by_id(&self, id: TreatmentId) -> RepositoryResult<Option<Treatment>> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let db_treatment = treatments::table
            .find(id.get())
            .first::<DbTreatment>(&mut conn)
            .optional()?;

        Ok(db_treatment.map(Treatment::try_from).transpose()?)
    }

    fn get_treatments_by_ids(&self, ids: &[TreatmentId]) -> RepositoryResult<Vec<Treatment>> {
        use crate::schema::treatments;

        let ids: Vec<i32> = ids.iter().map(|id| id.get()).collect();
        let mut conn = self.conn()?;
        let rows = treatments::table
            .filter(treatments::id.eq_any(ids))
            .order(treatments::id.asc())
            .load::<DbTreatment>(&mut conn)?;

        into_treatments(rows)
    }

    fn list_treatments(&self, category: Option<String>) -> RepositoryResult<Vec<Treatment>> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let mut query = treatments::table.into_boxed();
        if let Some(category) = category {
            query = query.filter(treatments::category.eq(category));
        }
        let rows = query
            .order((treatments::category.asc(), treatments::name.asc()))
            .load::<DbTreatment>(&mut conn)?;

        into_treatments(rows)
    }

    fn list_treatment_categories(&self) -> RepositoryResult<Vec<String>> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let categories = treatments::table
            .select(treatments::category)
            .distinct()
            .order(treatments::category.asc())
            .load::<String>(&mut conn)?;
        Ok(categories)
    }
}

impl TreatmentWriter for DieselRepository {
    fn create_treatment(&self, new_treatment: &NewTreatment) -> RepositoryResult<Treatment> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let db_new_treatment: DbNewTreatment = new_treatment.into();
        let db_treatment = diesel::insert_into(treatments::table)
            .values(&db_new_treatment)
            .get_result::<DbTreatment>(&mut conn)?;

        Ok(Treatment::try_from(db_treatment)?)
    }

    fn update_treatment(
        &self,
        id: TreatmentId,
        updates: &UpdateTreatment,
    ) -> RepositoryResult<Treatment> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let db_updates: DbUpdateTreatment = updates.into();
        let db_treatment = diesel::update(treatments::table.find(id.get()))
            .set(&db_updates)
            .get_result::<DbTreatment>(&mut conn)?;

        Ok(Treatment::try_from(db_treatment)?)
    }

    fn upsert_treatments(&self, new_treatments: &[NewTreatment]) -> RepositoryResult<usize> {
        use crate::schema::treatments;

        let mut conn = self.conn()?;
        let rows: Vec<DbNewTreatment> = new_treatments.iter().map(Into::into).collect();

        conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let mut affected = 0;
            for row in &rows {
                affected += diesel::insert_into(treatments::table)
                    .values(row)
                    .on_conflict(treatments::code)
                    .do_update()
                    .set((
                        treatments::name.eq(excluded(treatments::name)),
                        treatments::category.eq(excluded(treatments::category)),
                        treatments::base_price.eq(excluded(treatments::base_price)),
                        treatments::description.eq(excluded(treatments::description)),
                    ))
                    .execute(conn)?;
            }
            Ok(affected)
        })
        .map_err(RepositoryError::from)
    }
}
