//! Mirrors jobs into the plan store.
//!
//! Each job becomes a plan (tagged with `job_id` in its metadata) holding a
//! single "Execution" phase, and each subtask becomes a task of that phase.
//! Attempts are recorded through the ordinary state machine, so the feedback
//! and retry counters of the journal read exactly like manually tracked work.

use serde_json::{json, Map};

use super::{
    job::{Job, Subtask, SubtaskResult},
    tools::ToolOutcome,
};
use crate::{
    error::Result,
    models::{PhaseAdvance, PlanStatus, WorkStatus},
    params::{
        AddFeedback, CreatePhase, CreatePlan, CreateTask, RecordRetry, UpdatePlanStatus,
        UpdateStatus,
    },
    store::PlanStore,
};

const EXECUTION_PHASE: &str = "Execution";

#[derive(Debug, Clone)]
pub(crate) struct Journal {
    store: PlanStore,
    user_id: String,
}

impl Journal {
    pub(crate) fn new(store: PlanStore, user_id: String) -> Self {
        Self { store, user_id }
    }

    /// Opens the job's plan on its first attempt, or restarts the execution
    /// phase on a retry.
    pub(crate) async fn begin_attempt(&self, job: &mut Job) -> Result<()> {
        if let Some(phase_id) = job.phase_id {
            self.store.start_phase(phase_id).await?;
            return Ok(());
        }

        let mut metadata = Map::new();
        metadata.insert("job_id".to_string(), json!(job.id));

        let plan = self
            .store
            .create_plan(&CreatePlan {
                title: format!("Job {}", job.id),
                description: None,
                goal: job.goal.clone(),
                user_id: self.user_id.clone(),
                parent_plan_id: None,
                metadata,
            })
            .await?;
        job.plan_id = Some(plan.id);

        let phase = self
            .store
            .add_phase(&CreatePhase {
                plan_id: plan.id,
                title: EXECUTION_PHASE.to_string(),
                description: None,
                order: 1,
            })
            .await?;
        job.phase_id = Some(phase.id);

        self.store.advance_to_next_phase(plan.id).await?;
        Ok(())
    }

    /// Creates the subtask's task on first sight and marks it in progress.
    pub(crate) async fn start_subtask(&self, job: &mut Job, subtask: &Subtask) -> Result<()> {
        let Some(phase_id) = job.phase_id else {
            return Ok(());
        };

        let task_id = match job.task_ids.get(&subtask.id) {
            Some(&id) => id,
            None => {
                let task = self
                    .store
                    .add_task(&CreateTask {
                        phase_id,
                        title: subtask.title.clone(),
                        description: Some(subtask.reasoning.clone())
                            .filter(|reasoning| !reasoning.is_empty()),
                        priority: Some(if subtask.critical { "high" } else { "medium" }.to_string()),
                        estimated_duration: None,
                    })
                    .await?;
                job.task_ids.insert(subtask.id.clone(), task.id);
                task.id
            }
        };

        if self.store.task_status(task_id).await?.can_start() {
            self.store.start_task(task_id).await?;
        } else {
            self.store
                .update_task_status(&UpdateStatus {
                    id: task_id,
                    status: WorkStatus::InProgress.as_str().to_string(),
                })
                .await?;
        }
        Ok(())
    }

    /// Completes the subtask's task, or logs the failure against it.
    pub(crate) async fn finish_subtask(&self, job: &Job, result: &SubtaskResult) -> Result<()> {
        let Some(&task_id) = job.task_ids.get(&result.subtask_id) else {
            return Ok(());
        };

        match &result.outcome {
            ToolOutcome::Success { .. } => {
                self.store.complete_task(task_id).await?;
            }
            ToolOutcome::Failure { kind, message } => {
                self.store
                    .add_task_feedback(&AddFeedback {
                        id: task_id,
                        message: message.clone(),
                        attempt: result.attempt,
                        details: Some(json!({ "tool": result.tool, "kind": kind })),
                    })
                    .await?;
                self.record_failure(task_id, false).await?;
            }
        }
        Ok(())
    }

    /// Logs a failed attempt against the execution phase.
    pub(crate) async fn attempt_failed(&self, job: &Job, error: &str) -> Result<()> {
        let Some(phase_id) = job.phase_id else {
            return Ok(());
        };

        self.store
            .add_phase_feedback(&AddFeedback {
                id: phase_id,
                message: error.to_string(),
                attempt: job.attempt(),
                details: None,
            })
            .await?;
        self.record_failure(phase_id, true).await
    }

    async fn record_failure(&self, id: u64, is_phase: bool) -> Result<()> {
        let retry = RecordRetry {
            id,
            last_attempt_status: WorkStatus::Failed.as_str().to_string(),
        };
        let failed = UpdateStatus {
            id,
            status: WorkStatus::Failed.as_str().to_string(),
        };

        if is_phase {
            self.store.increment_phase_retry(&retry).await?;
            self.store.update_phase_status(&failed).await?;
        } else {
            self.store.increment_task_retry(&retry).await?;
            self.store.update_task_status(&failed).await?;
        }
        Ok(())
    }

    /// Completes the execution phase and advances the plan to completion.
    pub(crate) async fn job_completed(&self, job: &Job) -> Result<()> {
        let (Some(plan_id), Some(phase_id)) = (job.plan_id, job.phase_id) else {
            return Ok(());
        };

        self.store.complete_phase(phase_id).await?;
        match self.store.advance_to_next_phase(plan_id).await? {
            PhaseAdvance::PlanCompleted { .. } => {}
            PhaseAdvance::Started { phase } => {
                log::warn!("Journal plan {plan_id} unexpectedly started phase {}", phase.id);
            }
        }
        Ok(())
    }

    /// Marks the job's plan failed once retries are exhausted.
    pub(crate) async fn job_failed(&self, job: &Job) -> Result<()> {
        let Some(plan_id) = job.plan_id else {
            return Ok(());
        };

        self.store
            .update_plan_status(&UpdatePlanStatus {
                id: plan_id,
                status: PlanStatus::Failed.as_str().to_string(),
            })
            .await?;
        Ok(())
    }
}
