//! Parameter structures for waypoint operations
//!
//! These structures are shared by every interface (the CLI today, an API
//! layer tomorrow) and carry no framework-specific derives. Interface layers
//! define their own argument types and convert into these.
//!
//! Status and priority fields are plain strings here; they are validated
//! when converted into typed requests, so an unrecognised value surfaces as
//! [`WaypointError::InvalidStatus`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{Result, WaypointError},
    models::{Priority, WorkStatus},
};

/// Parameters for creating a new plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePlan {
    /// Title of the plan (required)
    pub title: String,
    /// Optional detailed description of the plan
    pub description: Option<String>,
    /// What the plan should achieve (required)
    pub goal: String,
    /// Owner of the plan (required)
    pub user_id: String,
    /// Attach the new plan as a sub-plan of this one
    pub parent_plan_id: Option<u64>,
    /// Opaque key-value data stored alongside the plan
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CreatePlan {
    /// Reject blank required fields.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("title", &self.title)?;
        require_non_blank("goal", &self.goal)?;
        require_non_blank("user_id", &self.user_id)
    }
}

/// Parameters for listing a user's plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPlans {
    /// Owner whose plans are listed
    pub user_id: String,
    /// Optional status filter (planning, active, completed, failed)
    pub status: Option<String>,
}

/// Parameters for adding a phase to a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePhase {
    /// ID of the plan to add the phase to
    pub plan_id: u64,
    /// Title of the phase (required)
    pub title: String,
    /// Optional detailed description
    pub description: Option<String>,
    /// Traversal order (defaults to 0)
    #[serde(default)]
    pub order: i64,
}

/// Parameters for adding a task to a phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    /// ID of the phase to add the task to
    pub phase_id: u64,
    /// Title of the task (required)
    pub title: String,
    /// Optional detailed description
    pub description: Option<String>,
    /// low, medium or high (defaults to medium)
    pub priority: Option<String>,
    /// Expected duration in seconds
    pub estimated_duration: Option<u64>,
}

impl CreateTask {
    /// Parse the priority, defaulting to medium.
    pub fn priority(&self) -> Result<Priority> {
        self.priority
            .as_deref()
            .map_or(Ok(Priority::default()), str::parse)
    }
}

/// Parameters for the generic status setter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// ID of the phase or task
    pub id: u64,
    /// New status (pending, in_progress, completed, failed)
    pub status: String,
}

impl UpdateStatus {
    /// Parse the status string.
    ///
    /// ```rust
    /// use waypoint_core::{params::UpdateStatus, models::WorkStatus};
    ///
    /// let ok = UpdateStatus { id: 1, status: "failed".into() };
    /// assert_eq!(ok.validate()?, WorkStatus::Failed);
    ///
    /// let bad = UpdateStatus { id: 1, status: "done".into() };
    /// assert!(bad.validate().is_err());
    /// # Ok::<(), waypoint_core::WaypointError>(())
    /// ```
    pub fn validate(&self) -> Result<WorkStatus> {
        self.status.parse()
    }
}

/// Parameters for appending feedback to a phase or task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddFeedback {
    /// ID of the phase or task
    pub id: u64,
    /// What happened
    pub message: String,
    /// Attempt number the feedback refers to
    pub attempt: u32,
    /// Optional structured details
    pub details: Option<Value>,
}

/// Parameters for recording a retry attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRetry {
    /// ID of the phase or task
    pub id: u64,
    /// Status the attempt ended in
    pub last_attempt_status: String,
}

impl RecordRetry {
    /// Parse the attempt status string.
    pub fn validate(&self) -> Result<WorkStatus> {
        self.last_attempt_status.parse()
    }
}

/// Parameters for setting a plan's status directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlanStatus {
    pub id: u64,
    /// planning, active or failed; completion goes through phase advance
    pub status: String,
}

/// Parameters for editing phase details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePhase {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    /// Reject the edit if the phase changed since this version was read
    pub expected_version: Option<u64>,
}

/// Parameters for editing task details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub estimated_duration: Option<u64>,
    /// Reject the edit if the task changed since this version was read
    pub expected_version: Option<u64>,
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WaypointError::invalid_input(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_plan_validation() {
        let params = CreatePlan {
            title: "Test Plan".into(),
            goal: "goal".into(),
            user_id: "u1".into(),
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        let blank_goal = CreatePlan {
            goal: "   ".into(),
            ..params
        };
        match blank_goal.validate() {
            Err(WaypointError::InvalidInput { field, .. }) => assert_eq!(field, "goal"),
            other => panic!("expected invalid goal, got {other:?}"),
        }
    }

    #[test]
    fn test_create_task_priority_defaults_to_medium() {
        let params = CreateTask {
            phase_id: 1,
            title: "Step 1".into(),
            ..Default::default()
        };
        assert_eq!(params.priority().unwrap(), Priority::Medium);

        let high = CreateTask {
            priority: Some("HIGH".into()),
            ..params.clone()
        };
        assert_eq!(high.priority().unwrap(), Priority::High);

        let bogus = CreateTask {
            priority: Some("urgent".into()),
            ..params
        };
        assert!(bogus.priority().is_err());
    }

    #[test]
    fn test_record_retry_rejects_unknown_status() {
        let params = RecordRetry {
            id: 3,
            last_attempt_status: "exploded".into(),
        };
        assert!(matches!(
            params.validate(),
            Err(WaypointError::InvalidStatus { value }) if value == "exploded"
        ));
    }
}
