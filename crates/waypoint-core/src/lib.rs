//! Core library for waypoint: durable plans and a retrying executor.
//!
//! The crate has two halves that share one SQLite store:
//!
//! - **Tracking** ([`store`], [`models`]): a Plan → Phase → Task hierarchy
//!   with a small state machine (`pending → in_progress → {completed,
//!   failed}`), append-only feedback, retry counters and progress
//!   aggregation. Every transition is one conditional update, so the store
//!   can be shared between concurrent callers.
//! - **Execution** ([`execution`]): a single-job loop that asks a
//!   [`Planner`](execution::Planner) for subtasks, dispatches them to
//!   registered [`Tool`](execution::Tool)s, consults a
//!   [`Learner`](execution::Learner) after each attempt and retries failed
//!   jobs ahead of the rest of the queue. Jobs can be journalled into the
//!   store as plans.
//!
//! Models implement [`std::fmt::Display`] as markdown; [`display`] adds
//! wrappers for lists and operation results.
//!
//! # Quick Start
//!
//! ```rust
//! use waypoint_core::{
//!     params::{CreatePhase, CreatePlan, CreateTask},
//!     PlanStoreBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PlanStoreBuilder::new()
//!     .with_database_path(Some("test.db"))
//!     .build()
//!     .await?;
//!
//! let plan = store
//!     .create_plan(&CreatePlan {
//!         title: "Website".to_string(),
//!         goal: "Launch the landing page".to_string(),
//!         user_id: "u1".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! let phase = store
//!     .add_phase(&CreatePhase {
//!         plan_id: plan.id,
//!         title: "Build".to_string(),
//!         description: None,
//!         order: 1,
//!     })
//!     .await?;
//! store
//!     .add_task(&CreateTask {
//!         phase_id: phase.id,
//!         title: "Write copy".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! println!("{}", store.get_plan_details(plan.id).await?);
//! println!("{}", store.get_plan_progress(plan.id).await?);
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod display;
pub mod error;
pub mod execution;
pub mod models;
pub mod params;
pub mod store;

pub use db::Database;
pub use display::{CreateResult, LocalDateTime, OperationStatus, Plans, UpdateResult};
pub use error::{Result, WaypointError};
pub use execution::{ExecutionLoop, ExecutionLoopBuilder, LoopConfig, LoopStatus};
pub use models::{Phase, PhaseAdvance, Plan, PlanProgress, PlanStatus, Priority, Task, WorkStatus};
pub use store::{PlanStore, PlanStoreBuilder};
