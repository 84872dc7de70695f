//! Command handlers.
//!
//! Each handler converts its clap arguments into core params, calls the
//! [`PlanStore`] and renders the result's markdown `Display`.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use waypoint_core::{
    display::{CreateResult, OperationStatus, Plans, UpdateResult},
    execution::{ExecutionLoopBuilder, JobStatus, LoopConfig, LoopEvent},
    params::{AddFeedback, ListPlans},
    PlanStore, WaypointError,
};

use crate::{
    args::{PhaseCommands, PlanCommands, RunArgs, TaskCommands},
    collaborators::{ErrorForwardingLearner, FilePlanner},
    renderer::TerminalRenderer,
    tools::builtin_tools,
};

pub struct Cli {
    store: PlanStore,
    renderer: TerminalRenderer,
    user_id: String,
}

impl Cli {
    pub fn new(store: PlanStore, renderer: TerminalRenderer, user_id: String) -> Self {
        Self {
            store,
            renderer,
            user_id,
        }
    }

    pub async fn list_plans(&self, params: &ListPlans) -> Result<()> {
        let plans = self.store.list_user_plans(params).await?;
        self.renderer.render(&Plans(plans));
        Ok(())
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Create(args) => {
                let params = args.into_params(self.user_id.clone())?;
                let plan = self.store.create_plan(&params).await?;
                self.renderer.render(&CreateResult::new(plan));
            }
            PlanCommands::List(args) => {
                self.list_plans(&args.into_params(self.user_id.clone()))
                    .await?;
            }
            PlanCommands::Show(args) => {
                let plan = self.store.get_plan_details(args.id).await?;
                self.renderer.render(&plan);
            }
            PlanCommands::Progress(args) => {
                let progress = self.store.get_plan_progress(args.id).await?;
                self.renderer.render(&progress);
            }
            PlanCommands::Advance(args) => {
                let advance = self.store.advance_to_next_phase(args.id).await?;
                self.renderer.render(&advance);
            }
            PlanCommands::Status(args) => {
                let plan = self.store.update_plan_status(&args.into()).await?;
                self.renderer.render(&UpdateResult::new(plan, "Updated"));
            }
            PlanCommands::Delete(args) => {
                if !args.confirm {
                    bail!("Refusing to delete plan {} without --confirm", args.id);
                }
                self.store.delete_plan(args.id).await?;
                self.renderer.render(&OperationStatus::success(format!(
                    "Deleted plan {} with its phases and tasks",
                    args.id
                )));
            }
        }
        Ok(())
    }

    pub async fn handle_phase_command(&self, command: PhaseCommands) -> Result<()> {
        let (phase, action) = match command {
            PhaseCommands::Add(args) => {
                let phase = self.store.add_phase(&args.into()).await?;
                self.renderer.render(&CreateResult::new(phase));
                return Ok(());
            }
            PhaseCommands::Show(args) => {
                let phase = self
                    .store
                    .get_phase(args.id)
                    .await?
                    .ok_or(WaypointError::PhaseNotFound { id: args.id })?;
                self.renderer.render(&phase);
                return Ok(());
            }
            PhaseCommands::Start(args) => (self.store.start_phase(args.id).await?, "Started"),
            PhaseCommands::Complete(args) => {
                (self.store.complete_phase(args.id).await?, "Completed")
            }
            PhaseCommands::Status(args) => (
                self.store.update_phase_status(&args.into()).await?,
                "Updated",
            ),
            PhaseCommands::Feedback(args) => {
                let feedback: AddFeedback = args.try_into()?;
                (
                    self.store.add_phase_feedback(&feedback).await?,
                    "Added feedback to",
                )
            }
            PhaseCommands::Retry(args) => (
                self.store.increment_phase_retry(&args.into()).await?,
                "Recorded retry of",
            ),
            PhaseCommands::Update(args) => {
                (self.store.update_phase(args.into()).await?, "Updated")
            }
        };
        self.renderer.render(&UpdateResult::new(phase, action));
        Ok(())
    }

    pub async fn handle_task_command(&self, command: TaskCommands) -> Result<()> {
        let (task, action) = match command {
            TaskCommands::Add(args) => {
                let task = self.store.add_task(&args.into()).await?;
                self.renderer.render(&CreateResult::new(task));
                return Ok(());
            }
            TaskCommands::Show(args) => {
                let task = self
                    .store
                    .get_task(args.id)
                    .await?
                    .ok_or(WaypointError::TaskNotFound { id: args.id })?;
                self.renderer.render(&task);
                return Ok(());
            }
            TaskCommands::Start(args) => (self.store.start_task(args.id).await?, "Started"),
            TaskCommands::Complete(args) => {
                (self.store.complete_task(args.id).await?, "Completed")
            }
            TaskCommands::Status(args) => (
                self.store.update_task_status(&args.into()).await?,
                "Updated",
            ),
            TaskCommands::Feedback(args) => {
                let feedback: AddFeedback = args.try_into()?;
                (
                    self.store.add_task_feedback(&feedback).await?,
                    "Added feedback to",
                )
            }
            TaskCommands::Retry(args) => (
                self.store.increment_task_retry(&args.into()).await?,
                "Recorded retry of",
            ),
            TaskCommands::Update(args) => (self.store.update_task(args.into()).await?, "Updated"),
        };
        self.renderer.render(&UpdateResult::new(task, action));
        Ok(())
    }

    /// Runs one goal through the execution loop, journaling it as a plan,
    /// until it completes, fails for good or Ctrl-C arrives.
    pub async fn run(&self, args: RunArgs) -> Result<()> {
        let context = args.context()?;
        let config = LoopConfig::default()
            .with_max_retries(args.max_retries)
            .with_retry_delay(Duration::from_millis(args.retry_delay_ms))
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms));

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let execution = ExecutionLoopBuilder::new()
            .with_planner(Arc::new(FilePlanner::new(args.subtasks)))
            .with_learner(Arc::new(ErrorForwardingLearner))
            .with_tools(builtin_tools())
            .with_journal(self.store.clone(), self.user_id.clone())
            .with_observer(Arc::new(events_tx))
            .with_config(config)
            .build()
            .context("Failed to build execution loop")?;

        let job_id = execution.add_task(args.goal, context).await;
        execution.start();

        tokio::select! {
            finished = wait_for_job(&mut events, job_id) => {
                if !finished {
                    warn!("Execution loop stopped reporting before job {job_id} finished");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, waiting for the running attempt to finish");
            }
        }
        execution.stop().await;

        let job = execution
            .job(job_id)
            .await
            .with_context(|| format!("Job {job_id} disappeared"))?;

        self.renderer.render(&job);
        if let Some(plan_id) = job.plan_id {
            let plan = self.store.get_plan_details(plan_id).await?;
            println!();
            self.renderer.render(&plan);
        }

        match job.status {
            JobStatus::Completed => Ok(()),
            JobStatus::Failed => bail!(
                "Job {job_id} failed after {} retries: {}",
                job.retries,
                job.error.as_deref().unwrap_or("unknown error")
            ),
            status => bail!("Job {job_id} interrupted while {status}"),
        }
    }
}

/// Consumes loop events until `job_id` completes or fails for good.
/// Returns `false` if the channel closes first.
async fn wait_for_job(events: &mut mpsc::UnboundedReceiver<LoopEvent>, job_id: u64) -> bool {
    while let Some(event) = events.recv().await {
        match event {
            LoopEvent::JobCompleted { job_id: id } if id == job_id => {
                info!("Job {job_id} completed");
                return true;
            }
            LoopEvent::JobFailed { job_id: id, error } if id == job_id => {
                info!("Job {job_id} failed: {error}");
                return true;
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_job_ignores_other_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(LoopEvent::JobQueued { job_id: 1 }).unwrap();
        tx.send(LoopEvent::JobRetrying {
            job_id: 1,
            retries: 1,
            error: "boom".to_string(),
        })
        .unwrap();
        tx.send(LoopEvent::JobCompleted { job_id: 2 }).unwrap();
        tx.send(LoopEvent::JobFailed {
            job_id: 1,
            error: "boom".to_string(),
        })
        .unwrap();

        assert!(wait_for_job(&mut rx, 1).await);
    }

    #[tokio::test]
    async fn test_wait_for_job_stops_when_channel_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(LoopEvent::JobCompleted { job_id: 2 }).unwrap();
        drop(tx);

        assert!(!wait_for_job(&mut rx, 1).await);
    }
}
