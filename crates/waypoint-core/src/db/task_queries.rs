//! Task operations.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{rows, WorkKind};
use crate::{
    error::{DatabaseResultExt, Result, WaypointError},
    models::{Task, UpdateTaskRequest, WorkStatus},
    params::CreateTask,
};

const TASK_COLUMNS: &str = "id, phase_id, title, description, status, retry_count, last_attempt_status, priority, estimated_duration, actual_duration, started_at, completed_at, version, created_at, updated_at";
const NEXT_TASK_POSITION_SQL: &str =
    "SELECT COALESCE(MAX(position), 0) + 1 FROM tasks WHERE phase_id = ?1";
const INSERT_TASK_SQL: &str = "INSERT INTO tasks (phase_id, title, description, position, status, priority, estimated_duration, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?7)";
const TOUCH_PHASE_SQL: &str =
    "UPDATE phases SET updated_at = ?1, version = version + 1 WHERE id = ?2";
const SELECT_TASK_TIMES_SQL: &str = "SELECT started_at, completed_at FROM tasks WHERE id = ?1";
const SET_ACTUAL_DURATION_SQL: &str = "UPDATE tasks SET actual_duration = ?1 WHERE id = ?2";
const UPDATE_TASK_SQL: &str = "UPDATE tasks SET title = COALESCE(?1, title), description = COALESCE(?2, description), priority = COALESCE(?3, priority), estimated_duration = COALESCE(?4, estimated_duration), updated_at = ?5, version = version + 1 WHERE id = ?6 AND (?7 IS NULL OR version = ?7)";

impl super::Database {
    fn build_task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: rows::id(row, 0)?,
            phase_id: rows::id(row, 1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: rows::parsed(row, 4)?,
            feedback: Vec::new(),
            retry_count: row.get::<_, i64>(5)? as u32,
            last_attempt_status: rows::optional_parsed(row, 6)?,
            priority: rows::parsed(row, 7)?,
            estimated_duration: rows::optional_id(row, 8)?,
            actual_duration: rows::optional_id(row, 9)?,
            started_at: rows::optional_timestamp(row, 10)?,
            completed_at: rows::optional_timestamp(row, 11)?,
            version: rows::id(row, 12)?,
            created_at: rows::timestamp(row, 13)?,
            updated_at: rows::timestamp(row, 14)?,
        })
    }

    pub(crate) fn fetch_task(conn: &Connection, id: u64) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let task = conn
            .query_row(&sql, params![id as i64], Self::build_task_from_row)
            .optional()
            .db_context("Failed to query task")?;

        match task {
            Some(mut task) => {
                task.feedback = Self::load_feedback(conn, WorkKind::Task, id)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    fn require_task(conn: &Connection, id: u64) -> Result<Task> {
        Self::fetch_task(conn, id)?.ok_or(WaypointError::TaskNotFound { id })
    }

    /// Stores the seconds between first start and completion.
    fn record_actual_duration(conn: &Connection, id: u64) -> Result<()> {
        let (started, completed) = conn
            .query_row(SELECT_TASK_TIMES_SQL, params![id as i64], |row| {
                Ok((
                    rows::optional_timestamp(row, 0)?,
                    rows::optional_timestamp(row, 1)?,
                ))
            })
            .db_context("Failed to query task timestamps")?;

        let (Some(started), Some(completed)) = (started, completed) else {
            return Ok(());
        };
        let seconds = (completed.as_second() - started.as_second()).max(0);

        conn.execute(SET_ACTUAL_DURATION_SQL, params![seconds, id as i64])
            .db_context("Failed to record actual duration")?;
        Ok(())
    }

    /// Adds a pending task and appends it to the phase's task list in one
    /// transaction.
    pub fn add_task(&mut self, params: &CreateTask) -> Result<Task> {
        if params.title.trim().is_empty() {
            return Err(WaypointError::invalid_input("title", "must not be empty"));
        }
        let priority = params.priority()?;

        let tx = self.write_transaction()?;

        Self::ensure_work_exists(&tx, WorkKind::Phase, params.phase_id)?;

        let position: i64 = tx
            .query_row(NEXT_TASK_POSITION_SQL, params![params.phase_id as i64], |row| {
                row.get(0)
            })
            .db_context("Failed to compute task position")?;

        let now_str = Timestamp::now().to_string();
        tx.execute(
            INSERT_TASK_SQL,
            params![
                params.phase_id as i64,
                &params.title,
                params.description.as_deref(),
                position,
                priority.as_str(),
                params.estimated_duration.map(|d| d as i64),
                &now_str
            ],
        )
        .db_context("Failed to insert task")?;

        let id = tx.last_insert_rowid() as u64;
        tx.execute(TOUCH_PHASE_SQL, params![&now_str, params.phase_id as i64])
            .db_context("Failed to update phase timestamp")?;

        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;

        Ok(task)
    }

    /// Retrieves a task with its feedback.
    pub fn get_task(&self, id: u64) -> Result<Option<Task>> {
        Self::fetch_task(&self.connection, id)
    }

    /// All tasks of a phase in insertion order.
    pub fn get_tasks(&self, phase_id: u64) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE phase_id = ?1 ORDER BY position");
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare query")?;

        let mut tasks = stmt
            .query_map(params![phase_id as i64], Self::build_task_from_row)
            .db_context("Failed to query tasks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch tasks")?;

        for task in &mut tasks {
            task.feedback = Self::load_feedback(&self.connection, WorkKind::Task, task.id)?;
        }

        Ok(tasks)
    }

    /// `pending | failed → in_progress`.
    pub fn start_task(&mut self, id: u64) -> Result<Task> {
        let tx = self.write_transaction()?;
        Self::start_work(&tx, WorkKind::Task, id, &Timestamp::now())?;
        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// `in_progress → completed`, recording the actual duration.
    pub fn complete_task(&mut self, id: u64) -> Result<Task> {
        let tx = self.write_transaction()?;
        Self::complete_work(&tx, WorkKind::Task, id, &Timestamp::now())?;
        Self::record_actual_duration(&tx, id)?;
        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// Sets a task's status without transition checks.
    pub fn update_task_status(&mut self, id: u64, status: WorkStatus) -> Result<Task> {
        let tx = self.write_transaction()?;
        Self::set_work_status(&tx, WorkKind::Task, id, status, &Timestamp::now())?;
        if status == WorkStatus::Completed {
            Self::record_actual_duration(&tx, id)?;
        }
        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// Appends a feedback entry to a task.
    pub fn add_task_feedback(
        &mut self,
        id: u64,
        message: &str,
        attempt: u32,
        details: Option<&Value>,
    ) -> Result<Task> {
        let tx = self.write_transaction()?;
        Self::append_feedback(
            &tx,
            WorkKind::Task,
            id,
            message,
            attempt,
            details,
            &Timestamp::now(),
        )?;
        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// Records one retry attempt on a task.
    pub fn increment_task_retry(
        &mut self,
        id: u64,
        last_attempt_status: WorkStatus,
    ) -> Result<Task> {
        let tx = self.write_transaction()?;
        Self::increment_work_retry(
            &tx,
            WorkKind::Task,
            id,
            last_attempt_status,
            &Timestamp::now(),
        )?;
        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// Edits task details, optionally guarded by the version last read.
    pub fn update_task(&mut self, id: u64, request: &UpdateTaskRequest) -> Result<Task> {
        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(WaypointError::invalid_input("title", "must not be empty"));
            }
        }

        let tx = self.write_transaction()?;

        let rows_affected = tx
            .execute(
                UPDATE_TASK_SQL,
                params![
                    request.title.as_deref(),
                    request.description.as_deref(),
                    request.priority.map(|p| p.as_str()),
                    request.estimated_duration.map(|d| d as i64),
                    Timestamp::now().to_string(),
                    id as i64,
                    request.expected_version.map(|v| v as i64)
                ],
            )
            .db_context("Failed to update task")?;

        if rows_affected == 0 {
            return Err(Self::version_miss(
                &tx,
                WorkKind::Task,
                id,
                request.expected_version,
            )?);
        }

        let task = Self::require_task(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(task)
    }

    /// Status a task is in.
    pub fn task_status(&self, id: u64) -> Result<WorkStatus> {
        Self::work_status(&self.connection, WorkKind::Task, id)?
            .ok_or(WaypointError::TaskNotFound { id })
    }
}
