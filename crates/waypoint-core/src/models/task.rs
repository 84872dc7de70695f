//! Task model definition.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Feedback, Priority, WorkStatus};

/// Smallest tracked unit of work within a phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier for the task
    pub id: u64,

    /// ID of the owning phase
    pub phase_id: u64,

    /// Brief title of the task
    pub title: String,

    /// Detailed description of the task
    pub description: Option<String>,

    /// Current status
    pub status: WorkStatus,

    /// Append-only attempt feedback
    #[serde(default)]
    pub feedback: Vec<Feedback>,

    /// Number of recorded retry attempts
    pub retry_count: u32,

    /// Status reported by the last recorded retry
    pub last_attempt_status: Option<WorkStatus>,

    #[serde(default)]
    pub priority: Priority,

    /// Expected duration in seconds
    pub estimated_duration: Option<u64>,

    /// Seconds between first start and completion
    pub actual_duration: Option<u64>,

    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,

    /// Optimistic concurrency counter
    pub version: u64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
