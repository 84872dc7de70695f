//! Completion statistics derived from the store.

use serde::{Deserialize, Serialize};

/// Completed-out-of-total counter with a rounded percentage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
}

impl Progress {
    /// Build a counter; the percentage is 0 when `total` is 0.
    ///
    /// ```rust
    /// use waypoint_core::models::Progress;
    ///
    /// assert_eq!(Progress::new(1, 3).percentage, 33);
    /// assert_eq!(Progress::new(2, 3).percentage, 67);
    /// assert_eq!(Progress::new(0, 0).percentage, 0);
    /// ```
    pub fn new(completed: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((f64::from(completed) * 100.0) / f64::from(total)).round() as u32
        };
        Self {
            completed,
            total,
            percentage,
        }
    }
}

/// Phase and task completion for one plan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanProgress {
    pub plan_id: u64,
    pub phase_progress: Progress,
    pub task_progress: Progress,
}
