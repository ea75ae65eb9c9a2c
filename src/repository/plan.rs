//! Versioned treatment plans a clinic proposes for a quote.

use chrono::Utc;
use diesel::{dsl::max, prelude::*};

use crate::{
    domain::{
        booking::{Booking, NewBooking},
        quote::QuoteStatus,
        treatment_plan::{NewPlanLine, NewTreatmentPlan, PlanStatus, TreatmentPlan, TreatmentPlanLine},
        types::{PlanId, PlanLineId, QuoteId},
    },
    models::{
        booking::{Booking as DbBooking, NewBooking as DbNewBooking},
        treatment_plan::{
            NewTreatmentPlan as DbNewTreatmentPlan, NewTreatmentPlanLine as DbNewTreatmentPlanLine,
            TreatmentPlan as DbTreatmentPlan, TreatmentPlanLine as DbTreatmentPlanLine,
            plan_into_domain,
        },
    },
    repository::{
        DieselRepository, PlanReader, PlanWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn load_plan(
    conn: &mut SqliteConnection,
    plan_id: i32,
) -> RepositoryResult<Option<TreatmentPlan>> {
    use crate::schema::{treatment_plan_lines, treatment_plans};

    let Some(plan) = treatment_plans::table
        .find(plan_id)
        .first::<DbTreatmentPlan>(conn)
        .optional()?
    else {
        return Ok(None);
    };
    let lines = DbTreatmentPlanLine::belonging_to(&plan)
        .order(treatment_plan_lines::id.asc())
        .load::<DbTreatmentPlanLine>(conn)?;
    Ok(Some(plan_into_domain(plan, lines)?))
}

fn open_statuses() -> [&'static str; 2] {
    [PlanStatus::Draft.as_str(), PlanStatus::Sent.as_str()]
}

impl PlanReader for DieselRepository {
    fn get_plan_by_id(&self, id: PlanId) -> RepositoryResult<Option<TreatmentPlan>> {
        let mut conn = self.conn()?;
        load_plan(&mut conn, id.get())
    }

    fn list_plans_for_quote(&self, quote_id: QuoteId) -> RepositoryResult<Vec<TreatmentPlan>> {
        use crate::schema::treatment_plans;

        let mut conn = self.conn()?;
        let plans = treatment_plans::table
            .filter(treatment_plans::quote_id.eq(quote_id.get()))
            .order((treatment_plans::version.desc(), treatment_plans::id.desc()))
            .load::<DbTreatmentPlan>(&mut conn)?;

        let lines = DbTreatmentPlanLine::belonging_to(&plans)
            .load::<DbTreatmentPlanLine>(&mut conn)?
            .grouped_by(&plans);

        plans
            .into_iter()
            .zip(lines)
            .map(|(plan, lines)| plan_into_domain(plan, lines).map_err(RepositoryError::from))
            .collect()
    }

    fn get_plan_line(&self, id: PlanLineId) -> RepositoryResult<Option<TreatmentPlanLine>> {
        use crate::schema::treatment_plan_lines;

        let mut conn = self.conn()?;
        let line = treatment_plan_lines::table
            .find(id.get())
            .first::<DbTreatmentPlanLine>(&mut conn)
            .optional()?;

        Ok(line.map(TreatmentPlanLine::try_from).transpose()?)
    }
}

impl PlanWriter for DieselRepository {
    fn create_plan(&self, new_plan: &NewTreatmentPlan) -> RepositoryResult<TreatmentPlan> {
        use crate::schema::{treatment_plan_lines, treatment_plans};

        let mut conn = self.conn()?;
        let (plan, lines) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let same_thread = treatment_plans::quote_id
                .eq(new_plan.quote_id.get())
                .and(treatment_plans::clinic_id.eq(new_plan.clinic_id.get()));

            let latest: Option<i32> = treatment_plans::table
                .filter(same_thread.clone())
                .select(max(treatment_plans::version))
                .first(conn)?;

            diesel::update(
                treatment_plans::table
                    .filter(same_thread)
                    .filter(treatment_plans::status.eq_any(open_statuses())),
            )
            .set((
                treatment_plans::status.eq(PlanStatus::Superseded.as_str()),
                treatment_plans::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

            let plan = diesel::insert_into(treatment_plans::table)
                .values(&DbNewTreatmentPlan {
                    quote_id: new_plan.quote_id.get(),
                    clinic_id: new_plan.clinic_id.get(),
                    patient_id: new_plan.patient_id.get(),
                    version: latest.unwrap_or(0) + 1,
                    status: PlanStatus::Draft.as_str(),
                    notes: new_plan.notes.as_ref().map(|n| n.as_str()),
                })
                .get_result::<DbTreatmentPlan>(conn)?;

            let db_lines = new_plan
                .lines
                .iter()
                .map(|line| DbNewTreatmentPlanLine::new(plan.id, line))
                .collect::<Vec<_>>();
            let lines = db_lines
                .iter()
                .map(|line| {
                    diesel::insert_into(treatment_plan_lines::table)
                        .values(line)
                        .get_result::<DbTreatmentPlanLine>(conn)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((plan, lines))
        })?;

        Ok(plan_into_domain(plan, lines)?)
    }

    fn update_plan_status(
        &self,
        id: PlanId,
        status: PlanStatus,
    ) -> RepositoryResult<TreatmentPlan> {
        use crate::schema::treatment_plans;

        let mut conn = self.conn()?;
        diesel::update(treatment_plans::table.find(id.get()))
            .set((
                treatment_plans::status.eq(status.as_str()),
                treatment_plans::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        load_plan(&mut conn, id.get())?.ok_or(RepositoryError::NotFound)
    }

    fn add_plan_line(
        &self,
        plan_id: PlanId,
        line: &NewPlanLine,
    ) -> RepositoryResult<TreatmentPlanLine> {
        use crate::schema::treatment_plan_lines;

        let mut conn = self.conn()?;
        let db_line = diesel::insert_into(treatment_plan_lines::table)
            .values(&DbNewTreatmentPlanLine::new(plan_id.get(), line))
            .get_result::<DbTreatmentPlanLine>(&mut conn)?;

        Ok(TreatmentPlanLine::try_from(db_line)?)
    }

    fn update_plan_line(
        &self,
        id: PlanLineId,
        line: &NewPlanLine,
    ) -> RepositoryResult<TreatmentPlanLine> {
        use crate::schema::treatment_plan_lines;

        let mut conn = self.conn()?;
        let plan_id = treatment_plan_lines::table
            .find(id.get())
            .select(treatment_plan_lines::plan_id)
            .first::<i32>(&mut conn)?;

        let db_line = diesel::update(treatment_plan_lines::table.find(id.get()))
            .set(&DbNewTreatmentPlanLine::new(plan_id, line))
            .get_result::<DbTreatmentPlanLine>(&mut conn)?;

        Ok(TreatmentPlanLine::try_from(db_line)?)
    }

    fn delete_plan_line(&self, id: PlanLineId) -> RepositoryResult<()> {
        use crate::schema::treatment_plan_lines;

        let mut conn = self.conn()?;
        let affected =
            diesel::delete(treatment_plan_lines::table.find(id.get())).execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn accept_plan(&self, id: PlanId, booking: &NewBooking) -> RepositoryResult<Booking> {
        use crate::schema::{bookings, quotes, treatment_plans};

        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();

        let db_booking = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let plan = diesel::update(treatment_plans::table.find(id.get()))
                .set((
                    treatment_plans::status.eq(PlanStatus::Accepted.as_str()),
                    treatment_plans::updated_at.eq(now),
                ))
                .get_result::<DbTreatmentPlan>(conn)?;

            diesel::update(
                treatment_plans::table
                    .filter(treatment_plans::quote_id.eq(plan.quote_id))
                    .filter(treatment_plans::id.ne(plan.id))
                    .filter(treatment_plans::status.eq(PlanStatus::Sent.as_str())),
            )
            .set((
                treatment_plans::status.eq(PlanStatus::Rejected.as_str()),
                treatment_plans::updated_at.eq(now),
            ))
            .execute(conn)?;

            diesel::update(quotes::table.find(plan.quote_id))
                .set((
                    quotes::status.eq(QuoteStatus::Accepted.as_str()),
                    quotes::clinic_id.eq(Some(plan.clinic_id)),
                    quotes::updated_at.eq(now),
                ))
                .execute(conn)?;

            let db_new_booking: DbNewBooking = booking.into();
            diesel::insert_into(bookings::table)
                .values(&db_new_booking)
                .get_result::<DbBooking>(conn)
        })?;

        Ok(Booking::try_from(db_booking)?)
    }
}
