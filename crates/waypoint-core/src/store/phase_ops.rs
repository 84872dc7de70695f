//! Phase operations for the PlanStore.

use super::PlanStore;
use crate::{
    error::Result,
    models::{Phase, UpdatePhaseRequest},
    params::{AddFeedback, CreatePhase, RecordRetry, UpdatePhase, UpdateStatus},
};

impl PlanStore {
    /// Adds a pending phase to the end of a plan's phase list.
    pub async fn add_phase(&self, params: &CreatePhase) -> Result<Phase> {
        let params = params.clone();
        self.with_db(move |db| db.add_phase(&params)).await
    }

    /// Retrieves a phase with its feedback and task ids.
    pub async fn get_phase(&self, id: u64) -> Result<Option<Phase>> {
        self.with_db(move |db| db.get_phase(id)).await
    }

    /// Starts a pending or failed phase and makes it the plan's current one.
    pub async fn start_phase(&self, id: u64) -> Result<Phase> {
        self.with_db(move |db| db.start_phase(id)).await
    }

    /// Completes a running phase.
    pub async fn complete_phase(&self, id: u64) -> Result<Phase> {
        self.with_db(move |db| db.complete_phase(id)).await
    }

    /// Sets a phase's status directly.
    ///
    /// # Errors
    ///
    /// Returns `WaypointError::InvalidStatus` for an unrecognised status.
    pub async fn update_phase_status(&self, params: &UpdateStatus) -> Result<Phase> {
        let id = params.id;
        let status = params.validate()?;
        self.with_db(move |db| db.update_phase_status(id, status))
            .await
    }

    /// Appends feedback to a phase, whatever its status.
    pub async fn add_phase_feedback(&self, params: &AddFeedback) -> Result<Phase> {
        let params = params.clone();
        self.with_db(move |db| {
            db.add_phase_feedback(
                params.id,
                &params.message,
                params.attempt,
                params.details.as_ref(),
            )
        })
        .await
    }

    /// Records a retry attempt on a phase.
    pub async fn increment_phase_retry(&self, params: &RecordRetry) -> Result<Phase> {
        let id = params.id;
        let status = params.validate()?;
        self.with_db(move |db| db.increment_phase_retry(id, status))
            .await
    }

    /// Edits a phase's title, description or order.
    pub async fn update_phase(&self, params: UpdatePhase) -> Result<Phase> {
        let id = params.id;
        let request = UpdatePhaseRequest::from(params);
        self.with_db(move |db| db.update_phase(id, &request)).await
    }
}
