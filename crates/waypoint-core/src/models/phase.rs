//! Phase model definition.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Feedback, Task, WorkStatus};

/// Ordered stage of a plan containing tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    /// Unique identifier for the phase
    pub id: u64,

    /// ID of the owning plan
    pub plan_id: u64,

    /// Brief title of the phase
    pub title: String,

    /// Detailed description of the phase
    pub description: Option<String>,

    /// Traversal order; equal values fall back to insertion order
    pub order: i64,

    /// Current status
    pub status: WorkStatus,

    /// Append-only attempt feedback
    #[serde(default)]
    pub feedback: Vec<Feedback>,

    /// Number of recorded retry attempts
    pub retry_count: u32,

    /// Status reported by the last recorded retry
    pub last_attempt_status: Option<WorkStatus>,

    /// Tasks in insertion order
    #[serde(default)]
    pub task_ids: Vec<u64>,

    /// Set on first start
    pub started_at: Option<Timestamp>,

    /// Set on completion
    pub completed_at: Option<Timestamp>,

    /// Optimistic concurrency counter
    pub version: u64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Associated tasks (only loaded by plan details)
    #[serde(default)]
    pub tasks: Vec<Task>,
}
