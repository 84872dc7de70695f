//! Retry-driven execution loop.
//!
//! The [`ExecutionLoop`] pulls queued goals one at a time, asks the
//! [`Planner`] for a subtask plan, dispatches every subtask through the
//! [`ToolRegistry`] strictly in sequence and lets the [`Verifier`] judge the
//! results. Failed attempts are reported to the [`Learner`], whose
//! alternative approach is folded into the job's context before the job is
//! re-run ahead of everything else in the queue.
//!
//! Exactly one job runs at a time and a running job is never cancelled.
//! Tools and collaborators run on their own tasks: a panic inside one fails
//! the attempt like any other error. Lifecycle events are emitted once the
//! job is visible in its new state through [`ExecutionLoop::job`].
//! Time only advances through [`ExecutionLoop::tick`]: the background task
//! started by [`ExecutionLoop::start`] calls it once per poll interval while
//! idle, and a retry whose delay has elapsed is promoted by the next tick.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use serde_json::{json, Map, Value};
//! use waypoint_core::execution::{
//!     AttemptOutcome, ExecutionLoopBuilder, Job, Learner, Lesson, Planner, Subtask, SubtaskPlan,
//!     Tool, ToolOutcome, ToolRegistry,
//! };
//!
//! struct OneStep;
//!
//! #[async_trait]
//! impl Planner for OneStep {
//!     async fn generate_plan(
//!         &self,
//!         goal: &str,
//!         _context: &Map<String, Value>,
//!     ) -> waypoint_core::Result<SubtaskPlan> {
//!         Ok(SubtaskPlan {
//!             subtasks: vec![Subtask {
//!                 id: "1".into(),
//!                 title: goal.into(),
//!                 tool: "echo".into(),
//!                 params: json!({"message": goal}),
//!                 reasoning: String::new(),
//!                 critical: true,
//!             }],
//!             ..Default::default()
//!         })
//!     }
//! }
//!
//! struct Forgetful;
//!
//! #[async_trait]
//! impl Learner for Forgetful {
//!     async fn learn_from_experience(
//!         &self,
//!         _job: &Job,
//!         _outcome: &AttemptOutcome,
//!         _success: bool,
//!     ) -> waypoint_core::Result<Lesson> {
//!         Ok(Lesson::default())
//!     }
//! }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     async fn execute(&self, params: &Value) -> ToolOutcome {
//!         ToolOutcome::success(params.clone())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> waypoint_core::Result<()> {
//! let mut tools = ToolRegistry::new();
//! tools.register("echo", Arc::new(Echo));
//!
//! let execution = ExecutionLoopBuilder::new()
//!     .with_planner(Arc::new(OneStep))
//!     .with_learner(Arc::new(Forgetful))
//!     .with_tools(tools)
//!     .build()?;
//!
//! let job_id = execution.add_task("say hello", Map::new()).await;
//! assert!(execution.tick().await);
//!
//! let status = execution.get_status().await;
//! assert_eq!(status.completed_tasks, 1);
//! assert!(execution.job(job_id).await.is_some());
//! # Ok(())
//! # }
//! ```

use std::{
    any::Any,
    collections::VecDeque,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex as StdMutex, PoisonError,
    },
};

use jiff::Timestamp;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{
    sync::{Mutex, Notify},
    task::{JoinError, JoinHandle},
    time::Instant,
};

pub mod collaborators;
pub mod config;
pub mod job;
mod journal;
pub mod observer;
pub mod tools;

pub use collaborators::{AllSubtasksSucceeded, Learner, Lesson, Planner, Verifier};
pub use config::LoopConfig;
pub use job::{AttemptOutcome, Job, JobStatus, Subtask, SubtaskPlan, SubtaskResult};
pub use observer::{LoopEvent, LoopObserver};
pub use tools::{FailureKind, Tool, ToolOutcome, ToolRegistry};

use self::journal::Journal;
use crate::{
    error::{Result, WaypointError},
    store::PlanStore,
};

/// Snapshot returned by [`ExecutionLoop::get_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopStatus {
    /// Whether the background polling task is active
    pub running: bool,
    /// Job currently executing, if any
    pub current_job: Option<u64>,
    /// Jobs waiting in the queue or on a retry delay
    pub queued_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    /// `completed / (completed + failed) * 100`, 0 before any job finished
    pub success_rate: f64,
}

#[derive(Default)]
struct LoopState {
    queue: VecDeque<Job>,
    /// Failed jobs waiting out their retry delay
    retrying: Vec<(Instant, Job)>,
    current: Option<Job>,
    completed: Vec<Job>,
    failed: Vec<Job>,
}

impl LoopState {
    /// Moves every retry whose delay has elapsed to the front of the queue,
    /// earliest due first.
    fn promote_due_retries(&mut self, now: Instant) {
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retrying)
            .into_iter()
            .partition(|(due_at, _)| *due_at <= now);
        self.retrying = waiting;

        due.sort_by_key(|(due_at, _)| *due_at);
        for (_, mut job) in due.into_iter().rev() {
            debug!("Re-queueing job {} for attempt {}", job.id, job.attempt());
            job.status = JobStatus::Queued;
            self.queue.push_front(job);
        }
    }

    fn find(&self, id: u64) -> Option<&Job> {
        self.current
            .iter()
            .chain(self.queue.iter())
            .chain(self.retrying.iter().map(|(_, job)| job))
            .chain(self.completed.iter())
            .chain(self.failed.iter())
            .find(|job| job.id == id)
    }
}

struct Inner {
    planner: Arc<dyn Planner>,
    learner: Arc<dyn Learner>,
    verifier: Arc<dyn Verifier>,
    tools: ToolRegistry,
    observer: Option<Arc<dyn LoopObserver>>,
    journal: Option<Journal>,
    config: LoopConfig,
    state: Mutex<LoopState>,
    /// Serialises ticks so at most one job runs
    tick_lock: Mutex<()>,
    next_job_id: AtomicU64,
    running: AtomicBool,
    shutdown: Notify,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

/// Cooperative single-job scheduler. Cloning yields another handle to the
/// same loop.
#[derive(Clone)]
pub struct ExecutionLoop {
    inner: Arc<Inner>,
}

impl ExecutionLoop {
    pub fn config(&self) -> &LoopConfig {
        &self.inner.config
    }

    /// Queues a goal and returns its job id.
    pub async fn add_task(&self, goal: impl Into<String>, context: Map<String, Value>) -> u64 {
        let id = self.inner.next_job_id.fetch_add(1, Ordering::SeqCst);
        let job = Job::new(id, goal.into(), context);
        info!("Queued job {id}: {}", job.goal);

        self.inner.state.lock().await.queue.push_back(job);
        self.emit(LoopEvent::JobQueued { job_id: id });
        id
    }

    /// Promotes due retries, then runs at most one job to completion.
    /// Returns whether a job ran.
    pub async fn tick(&self) -> bool {
        let _tick = self.inner.tick_lock.lock().await;

        let job = {
            let mut state = self.inner.state.lock().await;
            state.promote_due_retries(Instant::now());

            let Some(mut job) = state.queue.pop_front() else {
                return false;
            };
            job.status = JobStatus::Running;
            job.started_at.get_or_insert_with(Timestamp::now);
            state.current = Some(job.clone());
            job
        };

        self.run_attempt(job).await;
        true
    }

    /// Spawns the background polling task. Does nothing if already started.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("Execution loop already running");
            return;
        }

        let this = self.clone();
        let handle = tokio::spawn(async move {
            info!("Execution loop started");
            while this.inner.running.load(Ordering::SeqCst) {
                if this.tick().await {
                    continue;
                }
                tokio::select! {
                    _ = this.inner.shutdown.notified() => {}
                    _ = tokio::time::sleep(this.inner.config.poll_interval) => {}
                }
            }
            info!("Execution loop stopped");
        });

        *self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stops polling and waits for the running job, if any, to finish.
    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.notify_one();

        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Execution loop task ended abnormally: {e}");
            }
        }
    }

    pub async fn get_status(&self) -> LoopStatus {
        let state = self.inner.state.lock().await;
        let completed = state.completed.len();
        let failed = state.failed.len();
        let finished = completed + failed;

        LoopStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            current_job: state.current.as_ref().map(|job| job.id),
            queued_tasks: state.queue.len() + state.retrying.len(),
            completed_tasks: completed,
            failed_tasks: failed,
            success_rate: if finished == 0 {
                0.0
            } else {
                completed as f64 / finished as f64 * 100.0
            },
        }
    }

    /// Looks a job up wherever it currently is.
    pub async fn job(&self, id: u64) -> Option<Job> {
        self.inner.state.lock().await.find(id).cloned()
    }

    pub async fn completed_jobs(&self) -> Vec<Job> {
        self.inner.state.lock().await.completed.clone()
    }

    pub async fn failed_jobs(&self) -> Vec<Job> {
        self.inner.state.lock().await.failed.clone()
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(observer) = &self.inner.observer {
            observer.on_event(&event);
        }
    }

    /// Refreshes the copy of the running job that lookups see.
    async fn publish(&self, job: &Job) {
        self.inner.state.lock().await.current = Some(job.clone());
    }

    async fn learn(&self, job: &Job, outcome: AttemptOutcome, success: bool) -> Result<Lesson> {
        let learner = Arc::clone(&self.inner.learner);
        let job = job.clone();
        guarded("learner", async move {
            learner.learn_from_experience(&job, &outcome, success).await
        })
        .await
    }

    async fn run_attempt(&self, mut job: Job) {
        let attempt = job.attempt();
        info!("Job {} attempt {attempt} started", job.id);
        self.emit(LoopEvent::JobStarted {
            job_id: job.id,
            attempt,
        });

        if let Some(journal) = &self.inner.journal {
            if let Err(e) = journal.begin_attempt(&mut job).await {
                error!("Failed to journal start of job {}: {e}", job.id);
            }
        }

        match self.execute_attempt(&mut job).await {
            Ok(()) => self.finish_success(job).await,
            Err(e) => self.finish_failure(job, e).await,
        }
    }

    /// Plans, dispatches and verifies one attempt.
    async fn execute_attempt(&self, job: &mut Job) -> Result<()> {
        job.results.clear();
        job.error = None;

        let planner = Arc::clone(&self.inner.planner);
        let (goal, context) = (job.goal.clone(), job.context.clone());
        let plan = guarded("planner", async move {
            planner.generate_plan(&goal, &context).await
        })
        .await?;
        debug!(
            "Job {} planned {} subtask(s)",
            job.id,
            plan.subtasks.len()
        );
        job.plan = Some(plan.clone());
        self.publish(job).await;

        for subtask in &plan.subtasks {
            let tool = self
                .inner
                .tools
                .get(&subtask.tool)
                .ok_or_else(|| WaypointError::ToolNotFound {
                    name: subtask.tool.clone(),
                })?;

            if let Some(journal) = &self.inner.journal {
                if let Err(e) = journal.start_subtask(job, subtask).await {
                    error!("Failed to journal subtask {} of job {}: {e}", subtask.id, job.id);
                }
            }

            let result = SubtaskResult {
                subtask_id: subtask.id.clone(),
                title: subtask.title.clone(),
                tool: subtask.tool.clone(),
                critical: subtask.critical,
                attempt: job.attempt(),
                outcome: dispatch(tool, subtask.params.clone()).await,
            };

            if let Some(journal) = &self.inner.journal {
                if let Err(e) = journal.finish_subtask(job, &result).await {
                    error!("Failed to journal subtask {} of job {}: {e}", subtask.id, job.id);
                }
            }

            let failure = match &result.outcome {
                ToolOutcome::Success { .. } => {
                    self.emit(LoopEvent::SubtaskCompleted {
                        job_id: job.id,
                        subtask_id: subtask.id.clone(),
                    });
                    None
                }
                ToolOutcome::Failure { kind, message } => {
                    self.emit(LoopEvent::SubtaskFailed {
                        job_id: job.id,
                        subtask_id: subtask.id.clone(),
                        message: message.clone(),
                    });
                    Some(WaypointError::ToolExecution {
                        tool: subtask.tool.clone(),
                        message: format!("{kind}: {message}"),
                    })
                }
            };
            job.results.push(result);
            self.publish(job).await;

            if let Some(err) = failure {
                if subtask.critical {
                    warn!("Critical subtask {} of job {} failed", subtask.id, job.id);
                    return Err(err);
                }
                warn!(
                    "Non-critical subtask {} of job {} failed, continuing: {err}",
                    subtask.id, job.id
                );
            }
        }

        let verifier = Arc::clone(&self.inner.verifier);
        let snapshot = job.clone();
        let verified = guarded("verifier", async move {
            verifier.verify(&snapshot, &snapshot.results).await
        })
        .await?;
        if verified {
            return Ok(());
        }

        Err(match job.results.iter().find(|result| !result.succeeded()) {
            Some(SubtaskResult {
                tool,
                outcome: ToolOutcome::Failure { kind, message },
                ..
            }) => WaypointError::ToolExecution {
                tool: tool.clone(),
                message: format!("{kind}: {message}"),
            },
            _ => WaypointError::Collaborator {
                component: "verifier",
                message: "results do not satisfy the goal".to_string(),
            },
        })
    }

    async fn finish_success(&self, mut job: Job) {
        job.status = JobStatus::Completed;
        job.completed_at = Some(Timestamp::now());
        info!("Job {} completed on attempt {}", job.id, job.attempt());

        if let Some(journal) = &self.inner.journal {
            if let Err(e) = journal.job_completed(&job).await {
                error!("Failed to journal completion of job {}: {e}", job.id);
            }
        }

        let outcome = AttemptOutcome::Results(job.results.clone());
        if let Err(e) = self.learn(&job, outcome, true).await {
            warn!("Learner failed on completed job {}: {e}", job.id);
        }

        let job_id = job.id;
        {
            let mut state = self.inner.state.lock().await;
            state.current = None;
            state.completed.push(job);
        }
        self.emit(LoopEvent::JobCompleted { job_id });
    }

    async fn finish_failure(&self, mut job: Job, err: WaypointError) {
        let message = err.to_string();
        warn!("Job {} attempt {} failed: {message}", job.id, job.attempt());
        job.error = Some(message.clone());

        if let Some(journal) = &self.inner.journal {
            if let Err(e) = journal.attempt_failed(&job, &message).await {
                error!("Failed to journal failure of job {}: {e}", job.id);
            }
        }

        let lesson = self
            .learn(&job, AttemptOutcome::Error(message.clone()), false)
            .await;

        if job.retries < self.inner.config.max_retries {
            job.retries += 1;
            job.status = JobStatus::Retrying;

            match lesson {
                Ok(Lesson {
                    should_retry: true,
                    alternative_approach: Some(approach),
                    ..
                }) => job.merge_alternative(approach),
                Ok(_) => {}
                Err(e) => warn!("Learner failed on job {}: {e}", job.id),
            }

            info!(
                "Retrying job {} ({}/{}) in {:?}",
                job.id, job.retries, self.inner.config.max_retries, self.inner.config.retry_delay
            );
            let event = LoopEvent::JobRetrying {
                job_id: job.id,
                retries: job.retries,
                error: message,
            };

            let due = Instant::now() + self.inner.config.retry_delay;
            {
                let mut state = self.inner.state.lock().await;
                state.current = None;
                state.retrying.push((due, job));
            }
            self.emit(event);
            return;
        }

        if let Err(e) = lesson {
            warn!("Learner failed on job {}: {e}", job.id);
        }

        job.status = JobStatus::Failed;
        job.completed_at = Some(Timestamp::now());
        error!("Job {} failed after {} retries: {message}", job.id, job.retries);

        if let Some(journal) = &self.inner.journal {
            if let Err(e) = journal.job_failed(&job).await {
                error!("Failed to journal failure of job {}: {e}", job.id);
            }
        }

        let job_id = job.id;
        {
            let mut state = self.inner.state.lock().await;
            state.current = None;
            state.failed.push(job);
        }
        self.emit(LoopEvent::JobFailed {
            job_id,
            error: message,
        });
    }
}

/// Runs a collaborator call on its own task so that a panic fails the
/// attempt instead of unwinding through the loop.
async fn guarded<T, F>(component: &'static str, call: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(call)
        .await
        .unwrap_or_else(|e| {
            Err(WaypointError::Collaborator {
                component,
                message: join_failure(e),
            })
        })
}

/// Invokes a tool on its own task; a panic becomes a failed outcome.
async fn dispatch(tool: Arc<dyn Tool>, params: Value) -> ToolOutcome {
    match tokio::spawn(async move { tool.execute(&params).await }).await {
        Ok(outcome) => outcome,
        Err(e) => ToolOutcome::failure(FailureKind::Other, join_failure(e)),
    }
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {reason}")
}

/// Builder for [`ExecutionLoop`].
#[derive(Default)]
pub struct ExecutionLoopBuilder {
    planner: Option<Arc<dyn Planner>>,
    learner: Option<Arc<dyn Learner>>,
    verifier: Option<Arc<dyn Verifier>>,
    tools: ToolRegistry,
    observer: Option<Arc<dyn LoopObserver>>,
    journal: Option<Journal>,
    config: LoopConfig,
}

impl ExecutionLoopBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_learner(mut self, learner: Arc<dyn Learner>) -> Self {
        self.learner = Some(learner);
        self
    }

    /// Replaces the default [`AllSubtasksSucceeded`] verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Mirror every job into `store` as a plan owned by `user_id`.
    pub fn with_journal(mut self, store: PlanStore, user_id: impl Into<String>) -> Self {
        self.journal = Some(Journal::new(store, user_id.into()));
        self
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns `WaypointError::Configuration` when no planner or learner was
    /// supplied.
    pub fn build(self) -> Result<ExecutionLoop> {
        let planner = self.planner.ok_or_else(|| WaypointError::Configuration {
            message: "execution loop needs a planner".to_string(),
        })?;
        let learner = self.learner.ok_or_else(|| WaypointError::Configuration {
            message: "execution loop needs a learner".to_string(),
        })?;

        Ok(ExecutionLoop {
            inner: Arc::new(Inner {
                planner,
                learner,
                verifier: self
                    .verifier
                    .unwrap_or_else(|| Arc::new(AllSubtasksSucceeded)),
                tools: self.tools,
                observer: self.observer,
                journal: self.journal,
                config: self.config,
                state: Mutex::new(LoopState::default()),
                tick_lock: Mutex::new(()),
                next_job_id: AtomicU64::new(1),
                running: AtomicBool::new(false),
                shutdown: Notify::new(),
                worker: StdMutex::new(None),
            }),
        })
    }
}
