//! State-machine primitives shared by phases and tasks.
//!
//! Phases and tasks have the same status set and retry bookkeeping, so the
//! conditional updates live here once and are parameterised by [`WorkKind`].
//! Each primitive runs against an open connection or transaction; callers own
//! the transaction boundary.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::rows;
use crate::{
    error::{DatabaseResultExt, Result, WaypointError},
    models::{Feedback, WorkStatus},
};

/// Which table a state-machine operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkKind {
    Phase,
    Task,
}

impl WorkKind {
    fn table(self) -> &'static str {
        match self {
            WorkKind::Phase => "phases",
            WorkKind::Task => "tasks",
        }
    }

    fn feedback_column(self) -> &'static str {
        match self {
            WorkKind::Phase => "phase_id",
            WorkKind::Task => "task_id",
        }
    }

    pub(crate) fn entity(self) -> &'static str {
        match self {
            WorkKind::Phase => "phase",
            WorkKind::Task => "task",
        }
    }

    pub(crate) fn not_found(self, id: u64) -> WaypointError {
        match self {
            WorkKind::Phase => WaypointError::PhaseNotFound { id },
            WorkKind::Task => WaypointError::TaskNotFound { id },
        }
    }
}

impl super::Database {
    /// Current status of a phase or task, `None` if the row is missing.
    pub(crate) fn work_status(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
    ) -> Result<Option<WorkStatus>> {
        let sql = format!("SELECT status FROM {} WHERE id = ?1", kind.table());
        let status: Option<String> = conn
            .query_row(&sql, params![id as i64], |row| row.get(0))
            .optional()
            .db_context("Failed to query status")?;
        status.map(|s| s.parse()).transpose()
    }

    pub(crate) fn ensure_work_exists(conn: &Connection, kind: WorkKind, id: u64) -> Result<()> {
        match Self::work_status(conn, kind, id)? {
            Some(_) => Ok(()),
            None => Err(kind.not_found(id)),
        }
    }

    /// Explains why a conditional update matched no row.
    fn transition_refused(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        action: &'static str,
    ) -> WaypointError {
        match Self::work_status(conn, kind, id) {
            Ok(Some(current)) => WaypointError::InvalidTransition {
                entity: kind.entity(),
                id,
                from: current.as_str().to_string(),
                action,
            },
            Ok(None) => kind.not_found(id),
            Err(e) => e,
        }
    }

    /// `pending | failed → in_progress`; `started_at` is only set once.
    pub(crate) fn start_work(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        now: &Timestamp,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = 'in_progress', started_at = COALESCE(started_at, ?1), \
             updated_at = ?1, version = version + 1 \
             WHERE id = ?2 AND status IN ('pending', 'failed')",
            kind.table()
        );
        let rows_affected = conn
            .execute(&sql, params![now.to_string(), id as i64])
            .db_context("Failed to start work item")?;

        if rows_affected == 0 {
            return Err(Self::transition_refused(conn, kind, id, "start"));
        }
        Ok(())
    }

    /// `in_progress → completed`.
    pub(crate) fn complete_work(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        now: &Timestamp,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = 'completed', completed_at = ?1, \
             updated_at = ?1, version = version + 1 \
             WHERE id = ?2 AND status = 'in_progress'",
            kind.table()
        );
        let rows_affected = conn
            .execute(&sql, params![now.to_string(), id as i64])
            .db_context("Failed to complete work item")?;

        if rows_affected == 0 {
            return Err(Self::transition_refused(conn, kind, id, "complete"));
        }
        Ok(())
    }

    /// Unchecked status setter. `in_progress` keeps an existing `started_at`;
    /// `completed` stamps `completed_at`.
    pub(crate) fn set_work_status(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        status: WorkStatus,
        now: &Timestamp,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = ?1, \
             started_at = CASE WHEN ?1 = 'in_progress' THEN COALESCE(started_at, ?2) ELSE started_at END, \
             completed_at = CASE WHEN ?1 = 'completed' THEN ?2 ELSE completed_at END, \
             updated_at = ?2, version = version + 1 \
             WHERE id = ?3",
            kind.table()
        );
        let rows_affected = conn
            .execute(&sql, params![status.as_str(), now.to_string(), id as i64])
            .db_context("Failed to update status")?;

        if rows_affected == 0 {
            return Err(kind.not_found(id));
        }
        Ok(())
    }

    /// Adds one to `retry_count` and records the attempt's status.
    pub(crate) fn increment_work_retry(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        last_attempt_status: WorkStatus,
        now: &Timestamp,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET retry_count = retry_count + 1, last_attempt_status = ?1, \
             updated_at = ?2, version = version + 1 WHERE id = ?3",
            kind.table()
        );
        let rows_affected = conn
            .execute(
                &sql,
                params![last_attempt_status.as_str(), now.to_string(), id as i64],
            )
            .db_context("Failed to increment retry count")?;

        if rows_affected == 0 {
            return Err(kind.not_found(id));
        }
        Ok(())
    }

    /// Appends a feedback row. Accepted regardless of the owner's status.
    pub(crate) fn append_feedback(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        message: &str,
        attempt: u32,
        details: Option<&Value>,
        now: &Timestamp,
    ) -> Result<()> {
        Self::ensure_work_exists(conn, kind, id)?;

        let details = details.map(serde_json::to_string).transpose()?;
        let now_str = now.to_string();
        let sql = format!(
            "INSERT INTO feedback ({}, message, attempt, details, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            kind.feedback_column()
        );
        conn.execute(
            &sql,
            params![id as i64, message, i64::from(attempt), details, &now_str],
        )
        .db_context("Failed to insert feedback")?;

        let touch = format!(
            "UPDATE {} SET updated_at = ?1, version = version + 1 WHERE id = ?2",
            kind.table()
        );
        conn.execute(&touch, params![&now_str, id as i64])
            .db_context("Failed to update timestamp")?;
        Ok(())
    }

    /// Feedback for one phase or task, oldest first.
    pub(crate) fn load_feedback(conn: &Connection, kind: WorkKind, id: u64) -> Result<Vec<Feedback>> {
        let sql = format!(
            "SELECT message, attempt, details, created_at FROM feedback \
             WHERE {} = ?1 ORDER BY id",
            kind.feedback_column()
        );
        let mut stmt = conn
            .prepare(&sql)
            .db_context("Failed to prepare feedback query")?;

        let feedback = stmt
            .query_map(params![id as i64], |row| {
                Ok(Feedback {
                    message: row.get(0)?,
                    attempt: row.get::<_, i64>(1)? as u32,
                    timestamp: rows::timestamp(row, 3)?,
                    details: rows::optional_json(row, 2)?,
                })
            })
            .db_context("Failed to query feedback")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch feedback")?;

        Ok(feedback)
    }

    /// Builds the error for a version-guarded update that matched no row.
    pub(crate) fn version_miss(
        conn: &Connection,
        kind: WorkKind,
        id: u64,
        expected: Option<u64>,
    ) -> Result<WaypointError> {
        let sql = format!("SELECT version FROM {} WHERE id = ?1", kind.table());
        let found: Option<i64> = conn
            .query_row(&sql, params![id as i64], |row| row.get(0))
            .optional()
            .db_context("Failed to query version")?;

        Ok(match (found, expected) {
            (None, _) => kind.not_found(id),
            (Some(found), Some(expected)) => WaypointError::VersionConflict {
                entity: kind.entity(),
                id,
                expected,
                found: found as u64,
            },
            // Unconditional update that still missed: the row vanished mid-flight.
            (Some(_), None) => kind.not_found(id),
        })
    }
}
