//! Filter types for querying plans.

use super::PlanStatus;
use crate::error::WaypointError;

/// Filter options for listing a user's plans.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    /// Owner whose plans are listed
    pub user_id: String,

    /// Restrict to one status
    pub status: Option<PlanStatus>,
}

impl PlanFilter {
    /// Every plan owned by `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            status: None,
        }
    }
}

impl TryFrom<&crate::params::ListPlans> for PlanFilter {
    type Error = WaypointError;

    /// Convert ListPlans parameters, validating the optional status string.
    ///
    /// ```rust
    /// use waypoint_core::{models::{PlanFilter, PlanStatus}, params::ListPlans};
    ///
    /// let params = ListPlans { user_id: "u1".into(), status: Some("active".into()) };
    /// let filter = PlanFilter::try_from(&params)?;
    /// assert_eq!(filter.status, Some(PlanStatus::Active));
    ///
    /// let bad = ListPlans { user_id: "u1".into(), status: Some("archived".into()) };
    /// assert!(PlanFilter::try_from(&bad).is_err());
    /// # Ok::<(), waypoint_core::WaypointError>(())
    /// ```
    fn try_from(params: &crate::params::ListPlans) -> Result<Self, Self::Error> {
        let status = params
            .status
            .as_deref()
            .map(str::parse::<PlanStatus>)
            .transpose()?;
        Ok(Self {
            user_id: params.user_id.clone(),
            status,
        })
    }
}
