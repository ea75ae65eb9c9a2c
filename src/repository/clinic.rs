//! Clinics, their staff and per-treatment price overrides.

use chrono::Utc;
use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        clinic::{Clinic, NewClinic, UpdateClinic},
        treatment::ClinicTreatmentPrice,
        types::{ClinicId, TreatmentId, UserId},
        user::User,
    },
    models::{
        clinic::{
            Clinic as DbClinic, ClinicStaff as DbClinicStaff, ClinicTreatment as DbClinicTreatment,
            NewClinic as DbNewClinic, UpdateClinic as DbUpdateClinic,
        },
        user::User as DbUser,
    },
    repository::{ClinicListQuery, ClinicReader, ClinicWriter, DieselRepository, errors::RepositoryResult},
};

fn into_clinics(rows: Vec<DbClinic>) -> RepositoryResult<Vec<Clinic>> {
    Ok(rows
        .into_iter()
        .map(Clinic::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

impl ClinicReader for DieselRepository {
    fn get_clinic_by_id(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>> {
        use crate::schema::clinics;

        let mut conn = self.conn()?;
        let db_clinic = clinics::table
            .find(id.get())
            .first::<DbClinic>(&mut conn)
            .optional()?;

        Ok(db_clinic.map(Clinic::try_from).transpose()?)
    }

    fn get_clinic_by_slug(&self, slug: &str) -> RepositoryResult<Option<Clinic>> {
        use crate::schema::clinics;

        let mut conn = self.conn()?;
        let db_clinic = clinics::table
            .filter(clinics::slug.eq(slug))
            .first::<DbClinic>(&mut conn)
            .optional()?;

        Ok(db_clinic.map(Clinic::try_from).transpose()?)
    }

    fn list_clinics(&self, query: ClinicListQuery) -> RepositoryResult<(usize, Vec<Clinic>)> {
        use crate::schema::clinics;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = clinics::table.into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(city) = &query.city {
                items = items.filter(clinics::city.eq(city.clone()));
            }
            if query.verified_only {
                items = items.filter(clinics::verified.eq(true));
            }
            if let Some(term) = &query.search {
                let pattern = format!("%{term}%");
                items = items.filter(
                    clinics::name
                        .like(pattern.clone())
                        .or(clinics::city.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order((clinics::rating.desc(), clinics::name.asc()));
        if let Some(pagination) = &query.pagination {
            items = items.limit(pagination.limit()).offset(pagination.offset());
        }
        let clinics = into_clinics(items.load::<DbClinic>(&mut conn)?)?;

        Ok((total, clinics))
    }

    fn list_clinics_for_staff(&self, user_id: UserId) -> RepositoryResult<Vec<Clinic>> {
        use crate::schema::{clinic_staff, clinics};

        let mut conn = self.conn()?;
        let rows = clinics::table
            .inner_join(clinic_staff::table)
            .filter(clinic_staff::user_id.eq(user_id.get()))
            .order(clinics::name.asc())
            .select(DbClinic::as_select())
            .load::<DbClinic>(&mut conn)?;

        into_clinics(rows)
    }

    fn list_clinic_staff(&self, clinic_id: ClinicId) -> RepositoryResult<Vec<User>> {
        use crate::schema::{clinic_staff, users};

        let mut conn = self.conn()?;
        let users = users::table
            .inner_join(clinic_staff::table)
            .filter(clinic_staff::clinic_id.eq(clinic_id.get()))
            .order(users::name.asc())
            .select(DbUser::as_select())
            .load::<DbUser>(&mut conn)?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn list_clinic_prices(
        &self,
        clinic_id: ClinicId,
    ) -> RepositoryResult<Vec<ClinicTreatmentPrice>> {
        use crate::schema::clinic_treatments;

        let mut conn = self.conn()?;
        let prices = clinic_treatments::table
            .filter(clinic_treatments::clinic_id.eq(clinic_id.get()))
            .order(clinic_treatments::treatment_id.asc())
            .load::<DbClinicTreatment>(&mut conn)?
            .into_iter()
            .map(ClinicTreatmentPrice::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    fn list_prices_for_treatments(
        &self,
        treatment_ids: &[TreatmentId],
    ) -> RepositoryResult<Vec<ClinicTreatmentPrice>> {
        use crate::schema::clinic_treatments;

        let ids: Vec<i32> = treatment_ids.iter().map(|id| id.get()).collect();
        let mut conn = self.conn()?;
        let prices = clinic_treatments::table
            .filter(clinic_treatments::treatment_id.eq_any(ids))
            .load::<DbClinicTreatment>(&mut conn)?
            .into_iter()
            .map(ClinicTreatmentPrice::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }
}

impl ClinicWriter for DieselRepository {
    fn create_clinic(&self, new_clinic: &NewClinic) -> RepositoryResult<Clinic> {
        use crate::schema::clinics;

        let mut conn = self.conn()?;
        let db_new_clinic: DbNewClinic = new_clinic.into();
        let db_clinic = diesel::insert_into(clinics::table)
            .values(&db_new_clinic)
            .get_result::<DbClinic>(&mut conn)?;

        Ok(Clinic::try_from(db_clinic)?)
    }

    fn update_clinic(&self, id: ClinicId, updates: &UpdateClinic) -> RepositoryResult<Clinic> {
        use crate::schema::clinics;

        let mut conn = self.conn()?;
        let db_updates = DbUpdateClinic::new(updates, Utc::now().naive_utc());
        let db_clinic = diesel::update(clinics::table.find(id.get()))
            .set(&db_updates)
            .get_result::<DbClinic>(&mut conn)?;

        Ok(Clinic::try_from(db_clinic)?)
    }

    fn assign_clinic_staff(&self, clinic_id: ClinicId, user_id: UserId) -> RepositoryResult<()> {
        use crate::schema::clinic_staff;

        let mut conn = self.conn()?;
        diesel::insert_into(clinic_staff::table)
            .values(&DbClinicStaff {
                clinic_id: clinic_id.get(),
                user_id: user_id.get(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn remove_clinic_staff(&self, clinic_id: ClinicId, user_id: UserId) -> RepositoryResult<()> {
        use crate::schema::clinic_staff;

        let mut conn = self.conn()?;
        diesel::delete(
            clinic_staff::table
                .filter(clinic_staff::clinic_id.eq(clinic_id.get()))
                .filter(clinic_staff::user_id.eq(user_id.get())),
        )
        .execute(&mut conn)?;
        Ok(())
    }

    fn set_clinic_price(&self, price: &ClinicTreatmentPrice) -> RepositoryResult<()> {
        use crate::schema::clinic_treatments;

        let mut conn = self.conn()?;
        diesel::insert_into(clinic_treatments::table)
            .values(&DbClinicTreatment {
                clinic_id: price.clinic_id.get(),
                treatment_id: price.treatment_id.get(),
                price: price.price.pence(),
            })
            .on_conflict((clinic_treatments::clinic_id, clinic_treatments::treatment_id))
            .do_update()
            .set(clinic_treatments::price.eq(excluded(clinic_treatments::price)))
            .execute(&mut conn)?;
        Ok(())
    }

    fn remove_clinic_price(
        &self,
        clinic_id: ClinicId,
        treatment_id: TreatmentId,
    ) -> RepositoryResult<()> {
        use crate::schema::clinic_treatments;

        let mut conn = self.conn()?;
        diesel::delete(
            clinic_treatments::table
                .filter(clinic_treatments::clinic_id.eq(clinic_id.get()))
                .filter(clinic_treatments::treatment_id.eq(treatment_id.get())),
        )
        .execute(&mut conn)?;
        Ok(())
    }
}
