//! Async plan store over the SQLite database.
//!
//! [`PlanStore`] is the entry point for plan, phase and task operations.
//! It holds only the database path: each call opens its own connection on
//! the blocking thread pool, so a store can be cloned freely and shared
//! between the CLI, the execution loop and any other caller. Concurrent
//! writers are serialised by SQLite; every state transition is a single
//! conditional update, so racing callers never lose each other's changes.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   PlanStore     │    │  spawn_blocking │    │    Database     │
//! │ (plan_ops,      │───▶│  one connection │───▶│   (via db/)     │
//! │  phase_ops, ..) │    │  per operation  │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use waypoint_core::{PlanStoreBuilder, params::{CreatePhase, CreatePlan}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PlanStoreBuilder::new()
//!     .with_database_path(Some("/tmp/waypoint-example.db"))
//!     .build()
//!     .await?;
//!
//! let plan = store
//!     .create_plan(&CreatePlan {
//!         title: "Release".to_string(),
//!         goal: "Ship 1.0".to_string(),
//!         user_id: "u1".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let phase = store
//!     .add_phase(&CreatePhase {
//!         plan_id: plan.id,
//!         title: "Build".to_string(),
//!         description: None,
//!         order: 1,
//!     })
//!     .await?;
//! store.start_phase(phase.id).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tokio::task;

use crate::{
    db::Database,
    error::{Result, WaypointError},
};

pub mod builder;
pub mod phase_ops;
pub mod plan_ops;
pub mod task_ops;

#[cfg(test)]
mod tests;

pub use builder::PlanStoreBuilder;

/// Durable Plan → Phase → Task hierarchy.
#[derive(Debug, Clone)]
pub struct PlanStore {
    pub(crate) db_path: PathBuf,
}

impl PlanStore {
    pub(crate) fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    /// Path of the backing SQLite file.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `op` against a fresh connection on the blocking pool.
    pub(crate) async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            op(&mut db)
        })
        .await
        .map_err(|e| WaypointError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}
