//! Completion aggregates, derived from current rows on every call.

use rusqlite::params;

use crate::{
    error::{DatabaseResultExt, Result, WaypointError},
    models::{PlanProgress, Progress},
};

const PHASE_COUNTS_SQL: &str = "SELECT COUNT(*), COALESCE(SUM(status = 'completed'), 0) FROM phases WHERE plan_id = ?1";
const TASK_COUNTS_SQL: &str = "SELECT COUNT(*), COALESCE(SUM(t.status = 'completed'), 0) FROM tasks t JOIN phases p ON t.phase_id = p.id WHERE p.plan_id = ?1";

impl super::Database {
    /// Phase and task completion for a plan. Empty plans report 0%.
    ///
    /// All counts come from one read transaction, so phase and task
    /// figures describe the same moment.
    pub fn get_plan_progress(&self, plan_id: u64) -> Result<PlanProgress> {
        let tx = self
            .connection
            .unchecked_transaction()
            .db_context("Failed to begin read transaction")?;

        if !Self::plan_exists(&tx, plan_id)? {
            return Err(WaypointError::PlanNotFound { id: plan_id });
        }

        let counts = |sql: &str| -> Result<Progress> {
            let (total, completed): (i64, i64) = tx
                .query_row(sql, params![plan_id as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .db_context("Failed to count progress")?;
            Ok(Progress::new(completed as u32, total as u32))
        };

        let progress = PlanProgress {
            plan_id,
            phase_progress: counts(PHASE_COUNTS_SQL)?,
            task_progress: counts(TASK_COUNTS_SQL)?,
        };
        tx.commit().db_context("Failed to end read transaction")?;
        Ok(progress)
    }
}
