//! Markdown formatting for models and operation results.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]);
//! collections and operation outcomes get small wrapper types so each
//! output context can add its own heading or confirmation line.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │ Wrappers        │    │   Markdown      │
//! │ (Plan, Phase,   │───▶│ (Plans,         │───▶│   (terminal     │
//! │  Task, Job)     │    │  CreateResult)  │    │    renderer)    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ```rust
//! use waypoint_core::{display::OperationStatus, models::WorkStatus};
//!
//! assert_eq!(WorkStatus::InProgress.to_string(), "in_progress");
//! let done = OperationStatus::success("Deleted plan 3".to_string());
//! assert_eq!(done.to_string(), "Success: Deleted plan 3\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;

pub use collections::Plans;
pub use datetime::LocalDateTime;
pub use results::{CreateResult, UpdateResult};
pub use status::OperationStatus;
