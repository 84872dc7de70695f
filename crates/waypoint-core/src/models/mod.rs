//! Data models for plans, phases and tasks.
//!
//! The hierarchy is Plan → ordered Phases → ordered Tasks. Phases and tasks
//! share [`WorkStatus`] and carry the same retry bookkeeping: an append-only
//! [`Feedback`] list, a monotonically increasing `retry_count` and the status
//! reported by the last retry.
//!
//! Display implementations for these models live in
//! [`crate::display::models`] and format as markdown.
//!
//! ```rust
//! use waypoint_core::models::{Progress, WorkStatus};
//!
//! let status: WorkStatus = "in_progress".parse()?;
//! assert!(!status.can_start());
//! assert_eq!(Progress::new(0, 0).percentage, 0);
//! # Ok::<(), waypoint_core::WaypointError>(())
//! ```

pub mod feedback;
pub mod filters;
pub mod phase;
pub mod plan;
pub mod progress;
pub mod requests;
pub mod status;
pub mod task;

#[cfg(test)]
mod tests;

pub use feedback::Feedback;
pub use filters::PlanFilter;
pub use phase::Phase;
pub use plan::{PhaseAdvance, Plan};
pub use progress::{PlanProgress, Progress};
pub use requests::{UpdatePhaseRequest, UpdateTaskRequest};
pub use status::{PlanStatus, Priority, WorkStatus};
pub use task::Task;
