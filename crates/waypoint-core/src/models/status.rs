//! Status enumerations for plans, phases and tasks.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WaypointError;

/// Lifecycle of a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Plan is being laid out; no phase has started yet
    #[default]
    Planning,

    /// At least one phase has been started
    Active,

    /// Every phase has been traversed
    Completed,

    /// Plan was abandoned
    Failed,
}

impl FromStr for PlanStatus {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(PlanStatus::Planning),
            "active" => Ok(PlanStatus::Active),
            "completed" => Ok(PlanStatus::Completed),
            "failed" => Ok(PlanStatus::Failed),
            _ => Err(WaypointError::InvalidStatus { value: s.into() }),
        }
    }
}

impl PlanStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planning => "planning",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        }
    }
}

/// Status shared by phases and tasks.
///
/// `pending → in_progress → {completed, failed}`, with `failed` re-entering
/// `in_progress` through an explicit start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Not started yet
    #[default]
    Pending,

    /// Being worked on
    InProgress,

    /// Finished successfully
    Completed,

    /// Last attempt failed
    Failed,
}

impl FromStr for WorkStatus {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WorkStatus::Pending),
            "in_progress" | "inprogress" => Ok(WorkStatus::InProgress),
            "completed" => Ok(WorkStatus::Completed),
            "failed" => Ok(WorkStatus::Failed),
            _ => Err(WaypointError::InvalidStatus { value: s.into() }),
        }
    }
}

impl WorkStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Pending => "pending",
            WorkStatus::InProgress => "in_progress",
            WorkStatus::Completed => "completed",
            WorkStatus::Failed => "failed",
        }
    }

    /// Whether `start` may move this status to `in_progress`.
    pub fn can_start(&self) -> bool {
        matches!(self, WorkStatus::Pending | WorkStatus::Failed)
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// ```rust
    /// use waypoint_core::models::WorkStatus;
    ///
    /// assert_eq!(WorkStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(WorkStatus::Failed.with_icon(), "✗ Failed");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            WorkStatus::Completed => "✓ Completed",
            WorkStatus::InProgress => "➤ In Progress",
            WorkStatus::Pending => "○ Pending",
            WorkStatus::Failed => "✗ Failed",
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(WaypointError::invalid_input(
                "priority",
                format!("'{s}' is not one of low, medium, high"),
            )),
        }
    }
}

impl Priority {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}
