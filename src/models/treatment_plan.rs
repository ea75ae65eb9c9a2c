use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::treatment_plan::{
    NewPlanLine, PlanStatus, TreatmentPlan as DomainTreatmentPlan,
    TreatmentPlanLine as DomainTreatmentPlanLine,
};
use crate::domain::types::{
    ClinicId, Money, PlanId, PlanLineId, QuoteId, SafeText, TreatmentId, TypeConstraintError,
    UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::treatment_plans)]
pub struct TreatmentPlan {
    pub id: i32,
    pub quote_id: i32,
    pub clinic_id: i32,
    pub patient_id: i32,
    pub version: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::treatment_plans)]
pub struct NewTreatmentPlan<'a> {
    pub quote_id: i32,
    pub clinic_id: i32,
    pub patient_id: i32,
    pub version: i32,
    pub status: &'a str,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::treatment_plan_lines)]
#[diesel(belongs_to(TreatmentPlan, foreign_key = plan_id))]
pub struct TreatmentPlanLine {
    pub id: i32,
    pub plan_id: i32,
    pub treatment_id: Option<i32>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::treatment_plan_lines, treat_none_as_null = true)]
pub struct NewTreatmentPlanLine<'a> {
    pub plan_id: i32,
    pub treatment_id: Option<i32>,
    pub description: &'a str,
    pub quantity: i32,
    pub unit_price: i64,
}

impl<'a> NewTreatmentPlanLine<'a> {
    pub fn new(plan_id: i32, line: &'a NewPlanLine) -> Self {
        Self {
            plan_id,
            treatment_id: line.treatment_id.map(TreatmentId::get),
            description: line.description.as_str(),
            quantity: line.quantity,
            unit_price: line.unit_price.pence(),
        }
    }
}

impl TryFrom<TreatmentPlanLine> for DomainTreatmentPlanLine {
    type Error = TypeConstraintError;

    fn try_from(line: TreatmentPlanLine) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PlanLineId::new(line.id)?,
            plan_id: PlanId::new(line.plan_id)?,
            treatment_id: line.treatment_id.map(TreatmentId::new).transpose()?,
            description: SafeText::new(line.description)?,
            quantity: line.quantity,
            unit_price: Money::from_pence(line.unit_price)?,
        })
    }
}

/// Assembles a plan from its row and line rows.
pub fn plan_into_domain(
    plan: TreatmentPlan,
    lines: Vec<TreatmentPlanLine>,
) -> Result<DomainTreatmentPlan, TypeConstraintError> {
    let lines = lines
        .into_iter()
        .map(DomainTreatmentPlanLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DomainTreatmentPlan {
        id: PlanId::new(plan.id)?,
        quote_id: QuoteId::new(plan.quote_id)?,
        clinic_id: ClinicId::new(plan.clinic_id)?,
        patient_id: UserId::new(plan.patient_id)?,
        version: plan.version,
        status: PlanStatus::try_from(plan.status.as_str())?,
        notes: SafeText::optional(plan.notes)?,
        lines,
        created_at: plan.created_at,
        updated_at: plan.updated_at,
    })
}
