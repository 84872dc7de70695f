//! Command-line argument definitions.
//!
//! Argument structs carry the clap derives and convert into the
//! framework-free parameter types of `waypoint_core::params`, so the core
//! never sees clap:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → PlanStore
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::{Map, Value};
use waypoint_core::params::{
    AddFeedback, CreatePhase, CreatePlan, CreateTask, ListPlans, RecordRetry, UpdatePhase,
    UpdatePlanStatus, UpdateStatus, UpdateTask,
};

/// Hierarchical plan tracking with an autonomous, retrying executor
///
/// Plans group ordered phases, phases group tasks. Every phase and task
/// keeps an append-only feedback log and a retry counter, and `run` drives
/// a goal through planner-proposed tool invocations while journaling each
/// attempt as a plan.
#[derive(Parser)]
#[command(version, about, name = "wp")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/waypoint/waypoint.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Owner of created and listed plans
    #[arg(long, global = true, default_value = "local")]
    pub user: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage phases within plans
    #[command(alias = "ph")]
    Phase {
        #[command(subcommand)]
        command: PhaseCommands,
    },
    /// Manage tasks within phases
    #[command(alias = "t")]
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Execute a goal with the built-in tools until it succeeds or runs out
    /// of retries
    Run(RunArgs),
}

fn parse_json_object(field: &str, raw: Option<String>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(&raw).with_context(|| format!("--{field} is not valid JSON"))? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--{field} must be a JSON object, got {other}"),
    }
}

fn parse_json(field: &str, raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|raw| {
        serde_json::from_str(&raw).with_context(|| format!("--{field} is not valid JSON"))
    })
    .transpose()
}

/// Create a new plan
#[derive(ClapArgs)]
pub struct CreatePlanArgs {
    /// Title of the plan
    pub title: String,
    /// What the plan should achieve
    #[arg(short, long)]
    pub goal: String,
    /// Optional description providing more context about the plan
    #[arg(short, long)]
    pub description: Option<String>,
    /// Make this plan a sub-plan of an existing plan
    #[arg(long)]
    pub parent: Option<u64>,
    /// Free-form metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,
}

impl CreatePlanArgs {
    pub fn into_params(self, user_id: String) -> Result<CreatePlan> {
        Ok(CreatePlan {
            title: self.title,
            description: self.description,
            goal: self.goal,
            user_id,
            parent_plan_id: self.parent,
            metadata: parse_json_object("metadata", self.metadata)?,
        })
    }
}

/// List plans of the current user, newest first
#[derive(ClapArgs)]
pub struct ListPlansArgs {
    /// Only show plans in this status (planning, active, completed, failed)
    #[arg(short, long)]
    pub status: Option<String>,
}

impl ListPlansArgs {
    pub fn into_params(self, user_id: String) -> ListPlans {
        ListPlans {
            user_id,
            status: self.status,
        }
    }
}

/// Identifies a single plan, phase or task
#[derive(ClapArgs)]
pub struct IdArgs {
    /// Unique identifier
    pub id: u64,
}

/// Set the status of a plan
#[derive(ClapArgs)]
pub struct PlanStatusArgs {
    pub id: u64,
    /// New status (planning, active, failed)
    pub status: String,
}

impl From<PlanStatusArgs> for UpdatePlanStatus {
    fn from(val: PlanStatusArgs) -> Self {
        UpdatePlanStatus {
            id: val.id,
            status: val.status,
        }
    }
}

/// Delete a plan with its phases, tasks and feedback
#[derive(ClapArgs)]
pub struct DeletePlanArgs {
    pub id: u64,
    /// Confirm the deletion (required to prevent accidental deletion)
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a new plan
    #[command(alias = "c")]
    Create(CreatePlanArgs),
    /// List plans
    #[command(aliases = ["l", "ls"])]
    List(ListPlansArgs),
    /// Show a plan with its phases and tasks
    #[command(alias = "s")]
    Show(IdArgs),
    /// Show phase and task completion
    #[command(alias = "pr")]
    Progress(IdArgs),
    /// Start the next phase, or complete the plan when none is left
    #[command(alias = "a")]
    Advance(IdArgs),
    /// Set the status of a plan
    Status(PlanStatusArgs),
    /// Delete a plan permanently
    #[command(aliases = ["d", "rm"])]
    Delete(DeletePlanArgs),
}

/// Add a phase to a plan
#[derive(ClapArgs)]
pub struct AddPhaseArgs {
    /// ID of the plan to add the phase to
    pub plan_id: u64,
    /// Title of the phase
    pub title: String,
    #[arg(short, long)]
    pub description: Option<String>,
    /// Traversal order; ties keep insertion order
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub order: i64,
}

impl From<AddPhaseArgs> for CreatePhase {
    fn from(val: AddPhaseArgs) -> Self {
        CreatePhase {
            plan_id: val.plan_id,
            title: val.title,
            description: val.description,
            order: val.order,
        }
    }
}

/// Edit the details of a phase
#[derive(ClapArgs)]
pub struct UpdatePhaseArgs {
    pub id: u64,
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long, allow_negative_numbers = true)]
    pub order: Option<i64>,
    /// Reject the edit if the phase changed since this version
    #[arg(long)]
    pub expected_version: Option<u64>,
}

impl From<UpdatePhaseArgs> for UpdatePhase {
    fn from(val: UpdatePhaseArgs) -> Self {
        UpdatePhase {
            id: val.id,
            title: val.title,
            description: val.description,
            order: val.order,
            expected_version: val.expected_version,
        }
    }
}

/// Set the status of a phase or task without transition checks
#[derive(ClapArgs)]
pub struct StatusArgs {
    pub id: u64,
    /// New status (pending, in_progress, completed, failed)
    pub status: String,
}

impl From<StatusArgs> for UpdateStatus {
    fn from(val: StatusArgs) -> Self {
        UpdateStatus {
            id: val.id,
            status: val.status,
        }
    }
}

/// Append feedback to a phase or task
#[derive(ClapArgs)]
pub struct FeedbackArgs {
    pub id: u64,
    /// What happened
    pub message: String,
    /// Attempt the feedback refers to
    #[arg(short, long, default_value_t = 1)]
    pub attempt: u32,
    /// Structured details as JSON
    #[arg(long)]
    pub details: Option<String>,
}

impl TryFrom<FeedbackArgs> for AddFeedback {
    type Error = anyhow::Error;

    fn try_from(val: FeedbackArgs) -> Result<Self> {
        Ok(AddFeedback {
            id: val.id,
            message: val.message,
            attempt: val.attempt,
            details: parse_json("details", val.details)?,
        })
    }
}

/// Count a retry of a phase or task
#[derive(ClapArgs)]
pub struct RetryArgs {
    pub id: u64,
    /// Status the attempt ended in
    #[arg(default_value = "failed")]
    pub last_attempt_status: String,
}

impl From<RetryArgs> for RecordRetry {
    fn from(val: RetryArgs) -> Self {
        RecordRetry {
            id: val.id,
            last_attempt_status: val.last_attempt_status,
        }
    }
}

#[derive(Subcommand)]
pub enum PhaseCommands {
    /// Add a phase to a plan
    #[command(alias = "a")]
    Add(AddPhaseArgs),
    /// Show a phase with its tasks
    #[command(alias = "s")]
    Show(IdArgs),
    /// Start a pending or failed phase
    Start(IdArgs),
    /// Complete a phase
    Complete(IdArgs),
    /// Set the status of a phase
    Status(StatusArgs),
    /// Append feedback to a phase
    #[command(alias = "f")]
    Feedback(FeedbackArgs),
    /// Count a retry of a phase
    Retry(RetryArgs),
    /// Edit the details of a phase
    #[command(alias = "u")]
    Update(UpdatePhaseArgs),
}

/// Add a task to a phase
#[derive(ClapArgs)]
pub struct AddTaskArgs {
    /// ID of the phase to add the task to
    pub phase_id: u64,
    /// Title of the task
    pub title: String,
    #[arg(short, long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Expected duration in seconds
    #[arg(short, long)]
    pub estimate: Option<u64>,
}

impl From<AddTaskArgs> for CreateTask {
    fn from(val: AddTaskArgs) -> Self {
        CreateTask {
            phase_id: val.phase_id,
            title: val.title,
            description: val.description,
            priority: val.priority,
            estimated_duration: val.estimate,
        }
    }
}

/// Edit the details of a task
#[derive(ClapArgs)]
pub struct UpdateTaskArgs {
    pub id: u64,
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Expected duration in seconds
    #[arg(short, long)]
    pub estimate: Option<u64>,
    /// Reject the edit if the task changed since this version
    #[arg(long)]
    pub expected_version: Option<u64>,
}

impl From<UpdateTaskArgs> for UpdateTask {
    fn from(val: UpdateTaskArgs) -> Self {
        UpdateTask {
            id: val.id,
            title: val.title,
            description: val.description,
            priority: val.priority,
            estimated_duration: val.estimate,
            expected_version: val.expected_version,
        }
    }
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a phase
    #[command(alias = "a")]
    Add(AddTaskArgs),
    /// Show a task
    #[command(alias = "s")]
    Show(IdArgs),
    /// Start a pending or failed task
    Start(IdArgs),
    /// Complete a task
    Complete(IdArgs),
    /// Set the status of a task
    Status(StatusArgs),
    /// Append feedback to a task
    #[command(alias = "f")]
    Feedback(FeedbackArgs),
    /// Count a retry of a task
    Retry(RetryArgs),
    /// Edit the details of a task
    #[command(alias = "u")]
    Update(UpdateTaskArgs),
}

/// Execute a goal
///
/// The subtask file holds either a JSON array of subtasks or an object
/// with a `subtasks` array. Each subtask names a built-in tool (`echo` or
/// `shell`) and its params. The file is re-read for every attempt.
#[derive(ClapArgs)]
pub struct RunArgs {
    /// Goal to achieve
    pub goal: String,
    /// JSON file with the subtasks to execute
    #[arg(short, long)]
    pub subtasks: PathBuf,
    /// Initial planner context as a JSON object
    #[arg(long)]
    pub context: Option<String>,
    /// Retries after the first failed attempt
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
    /// Delay before a failed job is re-queued
    #[arg(long, default_value_t = 5000)]
    pub retry_delay_ms: u64,
    /// How often the idle loop looks for work
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,
}

impl RunArgs {
    pub fn context(&self) -> Result<Map<String, Value>> {
        parse_json_object("context", self.context.clone())
    }
}
