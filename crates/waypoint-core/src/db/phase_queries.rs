//! Phase operations: creation, state transitions and plan traversal.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{rows, WorkKind};
use crate::{
    error::{DatabaseResultExt, Result, WaypointError},
    models::{Phase, PhaseAdvance, UpdatePhaseRequest, WorkStatus},
    params::CreatePhase,
};

const PHASE_COLUMNS: &str = "id, plan_id, title, description, phase_order, status, retry_count, last_attempt_status, started_at, completed_at, version, created_at, updated_at";
const NEXT_PHASE_POSITION_SQL: &str =
    "SELECT COALESCE(MAX(position), 0) + 1 FROM phases WHERE plan_id = ?1";
const INSERT_PHASE_SQL: &str = "INSERT INTO phases (plan_id, title, description, phase_order, position, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?6)";
const TOUCH_PLAN_SQL: &str =
    "UPDATE plans SET updated_at = ?1, version = version + 1 WHERE id = ?2";
const SELECT_TASK_IDS_SQL: &str = "SELECT id FROM tasks WHERE phase_id = ?1 ORDER BY position";
const SELECT_PHASE_PLAN_SQL: &str = "SELECT plan_id FROM phases WHERE id = ?1";
const SET_CURRENT_PHASE_SQL: &str = "UPDATE plans SET current_phase_id = ?1, status = CASE WHEN status = 'planning' THEN 'active' ELSE status END, updated_at = ?2, version = version + 1 WHERE id = ?3";
const SELECT_CURRENT_PHASE_SQL: &str = "SELECT current_phase_id FROM plans WHERE id = ?1";
const SELECT_TRAVERSAL_SQL: &str =
    "SELECT id FROM phases WHERE plan_id = ?1 ORDER BY phase_order, position";
const COMPLETE_PLAN_SQL: &str = "UPDATE plans SET status = 'completed', updated_at = ?1, version = version + 1 WHERE id = ?2";
const UPDATE_PHASE_SQL: &str = "UPDATE phases SET title = COALESCE(?1, title), description = COALESCE(?2, description), phase_order = COALESCE(?3, phase_order), updated_at = ?4, version = version + 1 WHERE id = ?5 AND (?6 IS NULL OR version = ?6)";

impl super::Database {
    fn build_phase_from_row(row: &rusqlite::Row) -> rusqlite::Result<Phase> {
        Ok(Phase {
            id: rows::id(row, 0)?,
            plan_id: rows::id(row, 1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            order: row.get(4)?,
            status: rows::parsed(row, 5)?,
            feedback: Vec::new(),
            retry_count: row.get::<_, i64>(6)? as u32,
            last_attempt_status: rows::optional_parsed(row, 7)?,
            task_ids: Vec::new(),
            started_at: rows::optional_timestamp(row, 8)?,
            completed_at: rows::optional_timestamp(row, 9)?,
            version: rows::id(row, 10)?,
            created_at: rows::timestamp(row, 11)?,
            updated_at: rows::timestamp(row, 12)?,
            tasks: Vec::new(),
        })
    }

    /// Loads a phase with its feedback and task ids, but without tasks.
    pub(crate) fn fetch_phase(conn: &Connection, id: u64) -> Result<Option<Phase>> {
        let sql = format!("SELECT {PHASE_COLUMNS} FROM phases WHERE id = ?1");
        let phase = conn
            .query_row(&sql, params![id as i64], Self::build_phase_from_row)
            .optional()
            .db_context("Failed to query phase")?;

        match phase {
            Some(mut phase) => {
                Self::attach_phase_children(conn, &mut phase)?;
                Ok(Some(phase))
            }
            None => Ok(None),
        }
    }

    fn attach_phase_children(conn: &Connection, phase: &mut Phase) -> Result<()> {
        phase.feedback = Self::load_feedback(conn, WorkKind::Phase, phase.id)?;

        let mut stmt = conn
            .prepare(SELECT_TASK_IDS_SQL)
            .db_context("Failed to prepare task id query")?;
        phase.task_ids = stmt
            .query_map(params![phase.id as i64], |row| rows::id(row, 0))
            .db_context("Failed to query task ids")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch task ids")?;
        Ok(())
    }

    fn require_phase(conn: &Connection, id: u64) -> Result<Phase> {
        Self::fetch_phase(conn, id)?.ok_or(WaypointError::PhaseNotFound { id })
    }

    /// Adds a pending phase and appends it to the plan's phase list in one
    /// transaction.
    pub fn add_phase(&mut self, params: &CreatePhase) -> Result<Phase> {
        if params.title.trim().is_empty() {
            return Err(WaypointError::invalid_input("title", "must not be empty"));
        }

        let tx = self.write_transaction()?;

        if !Self::plan_exists(&tx, params.plan_id)? {
            return Err(WaypointError::PlanNotFound { id: params.plan_id });
        }

        let position: i64 = tx
            .query_row(NEXT_PHASE_POSITION_SQL, params![params.plan_id as i64], |row| {
                row.get(0)
            })
            .db_context("Failed to compute phase position")?;

        let now_str = Timestamp::now().to_string();
        tx.execute(
            INSERT_PHASE_SQL,
            params![
                params.plan_id as i64,
                &params.title,
                params.description.as_deref(),
                params.order,
                position,
                &now_str
            ],
        )
        .db_context("Failed to insert phase")?;

        let id = tx.last_insert_rowid() as u64;
        tx.execute(TOUCH_PLAN_SQL, params![&now_str, params.plan_id as i64])
            .db_context("Failed to update plan timestamp")?;

        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;

        Ok(phase)
    }

    /// Retrieves a phase with its feedback and task ids.
    pub fn get_phase(&self, id: u64) -> Result<Option<Phase>> {
        Self::fetch_phase(&self.connection, id)
    }

    /// All phases of a plan in insertion order, each with its tasks loaded.
    pub fn get_phases(&self, plan_id: u64) -> Result<Vec<Phase>> {
        let sql = format!("SELECT {PHASE_COLUMNS} FROM phases WHERE plan_id = ?1 ORDER BY position");
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare query")?;

        let mut phases = stmt
            .query_map(params![plan_id as i64], Self::build_phase_from_row)
            .db_context("Failed to query phases")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch phases")?;

        for phase in &mut phases {
            Self::attach_phase_children(&self.connection, phase)?;
            phase.tasks = self.get_tasks(phase.id)?;
        }

        Ok(phases)
    }

    /// Starts a phase inside an open transaction and points its plan at it.
    fn start_phase_in(conn: &Connection, id: u64, now: &Timestamp) -> Result<()> {
        Self::start_work(conn, WorkKind::Phase, id, now)?;

        let plan_id: i64 = conn
            .query_row(SELECT_PHASE_PLAN_SQL, params![id as i64], |row| row.get(0))
            .db_context("Failed to query owning plan")?;
        conn.execute(
            SET_CURRENT_PHASE_SQL,
            params![id as i64, now.to_string(), plan_id],
        )
        .db_context("Failed to set current phase")?;
        Ok(())
    }

    /// `pending | failed → in_progress`. Also makes the phase its plan's
    /// current phase and promotes a `planning` plan to `active`.
    pub fn start_phase(&mut self, id: u64) -> Result<Phase> {
        let tx = self.write_transaction()?;
        Self::start_phase_in(&tx, id, &Timestamp::now())?;
        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// `in_progress → completed`.
    pub fn complete_phase(&mut self, id: u64) -> Result<Phase> {
        let tx = self.write_transaction()?;
        Self::complete_work(&tx, WorkKind::Phase, id, &Timestamp::now())?;
        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// Sets a phase's status without transition checks.
    pub fn update_phase_status(&mut self, id: u64, status: WorkStatus) -> Result<Phase> {
        let tx = self.write_transaction()?;
        Self::set_work_status(&tx, WorkKind::Phase, id, status, &Timestamp::now())?;
        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// Appends a feedback entry to a phase.
    pub fn add_phase_feedback(
        &mut self,
        id: u64,
        message: &str,
        attempt: u32,
        details: Option<&Value>,
    ) -> Result<Phase> {
        let tx = self.write_transaction()?;
        Self::append_feedback(
            &tx,
            WorkKind::Phase,
            id,
            message,
            attempt,
            details,
            &Timestamp::now(),
        )?;
        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// Records one retry attempt on a phase.
    pub fn increment_phase_retry(
        &mut self,
        id: u64,
        last_attempt_status: WorkStatus,
    ) -> Result<Phase> {
        let tx = self.write_transaction()?;
        Self::increment_work_retry(
            &tx,
            WorkKind::Phase,
            id,
            last_attempt_status,
            &Timestamp::now(),
        )?;
        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// Edits phase details, optionally guarded by the version last read.
    pub fn update_phase(&mut self, id: u64, request: &UpdatePhaseRequest) -> Result<Phase> {
        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(WaypointError::invalid_input("title", "must not be empty"));
            }
        }

        let tx = self.write_transaction()?;

        let rows_affected = tx
            .execute(
                UPDATE_PHASE_SQL,
                params![
                    request.title.as_deref(),
                    request.description.as_deref(),
                    request.order,
                    Timestamp::now().to_string(),
                    id as i64,
                    request.expected_version.map(|v| v as i64)
                ],
            )
            .db_context("Failed to update phase")?;

        if rows_affected == 0 {
            return Err(Self::version_miss(
                &tx,
                WorkKind::Phase,
                id,
                request.expected_version,
            )?);
        }

        let phase = Self::require_phase(&tx, id)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(phase)
    }

    /// Moves a plan to the phase after its current one, ordered by
    /// `(order, insertion position)`. A plan with no current phase starts its
    /// first phase. When no phase follows, the plan is marked `completed`.
    pub fn advance_to_next_phase(&mut self, plan_id: u64) -> Result<PhaseAdvance> {
        let tx = self.write_transaction()?;

        let current: Option<i64> = tx
            .query_row(SELECT_CURRENT_PHASE_SQL, params![plan_id as i64], |row| {
                row.get(0)
            })
            .optional()
            .db_context("Failed to query plan")?
            .ok_or(WaypointError::PlanNotFound { id: plan_id })?;
        let current = current.map(|id| id as u64);

        let mut stmt = tx
            .prepare(SELECT_TRAVERSAL_SQL)
            .db_context("Failed to prepare traversal query")?;
        let ordered = stmt
            .query_map(params![plan_id as i64], |row| rows::id(row, 0))
            .db_context("Failed to query phases")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch phases")?;
        drop(stmt);

        let next_index = match current {
            Some(current_id) => ordered
                .iter()
                .position(|&id| id == current_id)
                .map_or(0, |index| index + 1),
            None => 0,
        };

        let now = Timestamp::now();
        let outcome = match ordered.get(next_index) {
            Some(&next_id) => {
                Self::start_phase_in(&tx, next_id, &now)?;
                log::debug!("Plan {plan_id} advanced to phase {next_id}");
                PhaseAdvance::Started {
                    phase: Self::require_phase(&tx, next_id)?,
                }
            }
            None => {
                tx.execute(COMPLETE_PLAN_SQL, params![now.to_string(), plan_id as i64])
                    .db_context("Failed to complete plan")?;
                log::debug!("Plan {plan_id} has no phase left, marking completed");
                PhaseAdvance::PlanCompleted {
                    plan: Self::fetch_plan(&tx, plan_id)?
                        .ok_or(WaypointError::PlanNotFound { id: plan_id })?,
                }
            }
        };

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(outcome)
    }
}
