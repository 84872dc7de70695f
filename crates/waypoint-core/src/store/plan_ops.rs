//! Plan operations for the PlanStore.

use super::PlanStore;
use crate::{
    error::Result,
    models::{PhaseAdvance, Plan, PlanFilter, PlanProgress, PlanStatus},
    params::{CreatePlan, ListPlans, UpdatePlanStatus},
};

impl PlanStore {
    /// Creates a plan in `planning` status, optionally as a sub-plan.
    pub async fn create_plan(&self, params: &CreatePlan) -> Result<Plan> {
        let params = params.clone();
        self.with_db(move |db| db.create_plan(&params)).await
    }

    /// Retrieves a plan without its phases.
    pub async fn get_plan(&self, id: u64) -> Result<Option<Plan>> {
        self.with_db(move |db| db.get_plan(id)).await
    }

    /// Retrieves a plan with every phase and each phase's tasks.
    ///
    /// # Errors
    ///
    /// Returns `WaypointError::PlanNotFound` if the plan does not exist.
    pub async fn get_plan_details(&self, id: u64) -> Result<Plan> {
        self.with_db(move |db| db.get_plan_details(id)).await
    }

    /// Lists a user's plans, newest first.
    pub async fn list_user_plans(&self, params: &ListPlans) -> Result<Vec<Plan>> {
        let filter = PlanFilter::try_from(params)?;
        self.with_db(move |db| db.list_plans(&filter)).await
    }

    /// Sets a plan's status to `planning`, `active` or `failed`.
    pub async fn update_plan_status(&self, params: &UpdatePlanStatus) -> Result<Plan> {
        let id = params.id;
        let status: PlanStatus = params.status.parse()?;
        self.with_db(move |db| db.update_plan_status(id, status)).await
    }

    /// Deletes a plan with all its phases, tasks and feedback.
    pub async fn delete_plan(&self, id: u64) -> Result<()> {
        self.with_db(move |db| db.delete_plan(id)).await?;
        log::info!("Deleted plan {id}");
        Ok(())
    }

    /// Starts the phase after the plan's current one, or completes the plan
    /// when none is left.
    pub async fn advance_to_next_phase(&self, plan_id: u64) -> Result<PhaseAdvance> {
        self.with_db(move |db| db.advance_to_next_phase(plan_id))
            .await
    }

    /// Phase and task completion percentages for a plan.
    pub async fn get_plan_progress(&self, plan_id: u64) -> Result<PlanProgress> {
        self.with_db(move |db| db.get_plan_progress(plan_id)).await
    }
}
