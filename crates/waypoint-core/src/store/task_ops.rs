//! Task operations for the PlanStore.

use super::PlanStore;
use crate::{
    error::Result,
    models::{Task, UpdateTaskRequest, WorkStatus},
    params::{AddFeedback, CreateTask, RecordRetry, UpdateStatus, UpdateTask},
};

impl PlanStore {
    /// Adds a pending task to the end of a phase's task list.
    pub async fn add_task(&self, params: &CreateTask) -> Result<Task> {
        let params = params.clone();
        self.with_db(move |db| db.add_task(&params)).await
    }

    /// Retrieves a task with its feedback.
    pub async fn get_task(&self, id: u64) -> Result<Option<Task>> {
        self.with_db(move |db| db.get_task(id)).await
    }

    /// Current status of a task.
    pub async fn task_status(&self, id: u64) -> Result<WorkStatus> {
        self.with_db(move |db| db.task_status(id)).await
    }

    /// Starts a pending or failed task.
    pub async fn start_task(&self, id: u64) -> Result<Task> {
        self.with_db(move |db| db.start_task(id)).await
    }

    /// Completes a running task and records how long it took.
    pub async fn complete_task(&self, id: u64) -> Result<Task> {
        self.with_db(move |db| db.complete_task(id)).await
    }

    /// Sets a task's status directly.
    ///
    /// # Errors
    ///
    /// Returns `WaypointError::InvalidStatus` for an unrecognised status.
    pub async fn update_task_status(&self, params: &UpdateStatus) -> Result<Task> {
        let id = params.id;
        let status = params.validate()?;
        self.with_db(move |db| db.update_task_status(id, status))
            .await
    }

    /// Appends feedback to a task, whatever its status.
    pub async fn add_task_feedback(&self, params: &AddFeedback) -> Result<Task> {
        let params = params.clone();
        self.with_db(move |db| {
            db.add_task_feedback(
                params.id,
                &params.message,
                params.attempt,
                params.details.as_ref(),
            )
        })
        .await
    }

    /// Records a retry attempt on a task.
    pub async fn increment_task_retry(&self, params: &RecordRetry) -> Result<Task> {
        let id = params.id;
        let status = params.validate()?;
        self.with_db(move |db| db.increment_task_retry(id, status))
            .await
    }

    /// Edits a task's title, description, priority or estimate.
    pub async fn update_task(&self, params: UpdateTask) -> Result<Task> {
        let id = params.id;
        let request = UpdateTaskRequest::try_from(params)?;
        self.with_db(move |db| db.update_task(id, &request)).await
    }
}
