//! Plan model definition.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Phase, PlanStatus};

/// Top-level unit of work: a goal broken into ordered phases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: u64,

    /// Title of the plan
    pub title: String,

    /// Detailed multi-line description of the plan
    pub description: Option<String>,

    /// What the plan is meant to achieve
    pub goal: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: PlanStatus,

    /// Parent plan, if this is a sub-plan. Weak: survives the parent's deletion
    /// as `None`.
    pub parent_plan_id: Option<u64>,

    /// Sub-plans in creation order
    #[serde(default)]
    pub sub_plan_ids: Vec<u64>,

    /// Phases in insertion order
    #[serde(default)]
    pub phase_ids: Vec<u64>,

    /// Phase most recently started
    pub current_phase_id: Option<u64>,

    /// Owner of the plan
    pub user_id: String,

    /// Opaque caller-supplied key-value data
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Optimistic concurrency counter, bumped by every mutation
    pub version: u64,

    /// Timestamp when the plan was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the plan was last modified (UTC)
    pub updated_at: Timestamp,

    /// Associated phases (only loaded by plan details)
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// Outcome of advancing a plan to its next phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PhaseAdvance {
    /// The next phase by traversal order was started
    Started { phase: Phase },
    /// No phase remained; the plan is now completed
    PlanCompleted { plan: Plan },
}
