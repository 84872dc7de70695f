//! Request types for updating models.

use super::Priority;

/// Detail edits for a phase. `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct UpdatePhaseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    /// Reject the edit unless the stored version still matches
    pub expected_version: Option<u64>,
}

impl UpdatePhaseRequest {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.order.is_none()
    }
}

impl From<crate::params::UpdatePhase> for UpdatePhaseRequest {
    fn from(params: crate::params::UpdatePhase) -> Self {
        Self {
            title: params.title,
            description: params.description,
            order: params.order,
            expected_version: params.expected_version,
        }
    }
}

/// Detail edits for a task. `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub estimated_duration: Option<u64>,
    /// Reject the edit unless the stored version still matches
    pub expected_version: Option<u64>,
}

impl UpdateTaskRequest {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.estimated_duration.is_none()
    }
}

impl TryFrom<crate::params::UpdateTask> for UpdateTaskRequest {
    type Error = crate::WaypointError;

    fn try_from(params: crate::params::UpdateTask) -> Result<Self, Self::Error> {
        let priority = params
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;
        Ok(Self {
            title: params.title,
            description: params.description,
            priority,
            estimated_duration: params.estimated_duration,
            expected_version: params.expected_version,
        })
    }
}
