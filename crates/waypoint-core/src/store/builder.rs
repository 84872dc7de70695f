//! Builder for creating and configuring PlanStore instances.

use std::path::{Path, PathBuf};

use tokio::task;

use super::PlanStore;
use crate::{
    db::Database,
    error::{Result, WaypointError},
};

/// Builder for creating and configuring PlanStore instances.
#[derive(Debug, Clone, Default)]
pub struct PlanStoreBuilder {
    database_path: Option<PathBuf>,
}

impl PlanStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses the XDG Base Directory specification:
    /// `$XDG_DATA_HOME/waypoint/waypoint.db` or
    /// `~/.local/share/waypoint/waypoint.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Creates the parent directory, applies the schema and returns the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns `WaypointError::FileSystem` if the parent directory cannot be
    /// created and `WaypointError::Database` if schema setup fails.
    pub async fn build(self) -> Result<PlanStore> {
        let db_path = match self.database_path {
            Some(path) => path,
            None => Self::default_database_path()?,
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| WaypointError::FileSystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let schema_path = db_path.clone();
        task::spawn_blocking(move || {
            Database::new(&schema_path)?;
            Ok::<(), WaypointError>(())
        })
        .await
        .map_err(|e| WaypointError::Configuration {
            message: format!("Task join error: {e}"),
        })??;

        log::debug!("Plan store ready at {}", db_path.display());
        Ok(PlanStore::new(db_path))
    }

    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("waypoint")
            .place_data_file("waypoint.db")
            .map_err(|e| WaypointError::XdgDirectory(e.to_string()))
    }
}
