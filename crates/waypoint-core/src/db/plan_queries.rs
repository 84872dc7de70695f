//! Plan CRUD operations and queries.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

use super::rows;
use crate::{
    error::{DatabaseResultExt, Result, WaypointError},
    models::{Plan, PlanFilter, PlanStatus},
    params::CreatePlan,
};

const INSERT_PLAN_SQL: &str = "INSERT INTO plans (title, description, goal, status, parent_plan_id, user_id, metadata, created_at, updated_at) VALUES (?1, ?2, ?3, 'planning', ?4, ?5, ?6, ?7, ?7)";
const SELECT_PLAN_SQL: &str = "SELECT id, title, description, goal, status, parent_plan_id, current_phase_id, user_id, metadata, version, created_at, updated_at FROM plans WHERE id = ?1";
const SELECT_USER_PLANS_SQL: &str = "SELECT id, title, description, goal, status, parent_plan_id, current_phase_id, user_id, metadata, version, created_at, updated_at FROM plans WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC, id DESC";
const SELECT_PHASE_IDS_SQL: &str = "SELECT id FROM phases WHERE plan_id = ?1 ORDER BY position";
const SELECT_SUB_PLAN_IDS_SQL: &str = "SELECT id FROM plans WHERE parent_plan_id = ?1 ORDER BY id";
const CHECK_PLAN_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM plans WHERE id = ?1)";
const UPDATE_PLAN_STATUS_SQL: &str =
    "UPDATE plans SET status = ?1, updated_at = ?2, version = version + 1 WHERE id = ?3";
const DELETE_PLAN_FEEDBACK_SQL: &str = "DELETE FROM feedback WHERE task_id IN (SELECT t.id FROM tasks t JOIN phases p ON t.phase_id = p.id WHERE p.plan_id = ?1) OR phase_id IN (SELECT id FROM phases WHERE plan_id = ?1)";
const DELETE_PLAN_TASKS_SQL: &str =
    "DELETE FROM tasks WHERE phase_id IN (SELECT id FROM phases WHERE plan_id = ?1)";
const CLEAR_CURRENT_PHASE_SQL: &str = "UPDATE plans SET current_phase_id = NULL WHERE id = ?1";
const DELETE_PLAN_PHASES_SQL: &str = "DELETE FROM phases WHERE plan_id = ?1";
const DETACH_SUB_PLANS_SQL: &str = "UPDATE plans SET parent_plan_id = NULL, updated_at = ?1, version = version + 1 WHERE parent_plan_id = ?2";
const DELETE_PLAN_SQL: &str = "DELETE FROM plans WHERE id = ?1";

impl super::Database {
    fn build_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
        Ok(Plan {
            id: rows::id(row, 0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            goal: row.get(3)?,
            status: rows::parsed(row, 4)?,
            parent_plan_id: rows::optional_id(row, 5)?,
            sub_plan_ids: Vec::new(),
            phase_ids: Vec::new(),
            current_phase_id: rows::optional_id(row, 6)?,
            user_id: row.get(7)?,
            metadata: rows::json(row, 8)?,
            version: rows::id(row, 9)?,
            created_at: rows::timestamp(row, 10)?,
            updated_at: rows::timestamp(row, 11)?,
            phases: Vec::new(),
        })
    }

    fn query_ids(conn: &Connection, sql: &str, parent_id: u64) -> Result<Vec<u64>> {
        let mut stmt = conn.prepare(sql).db_context("Failed to prepare query")?;
        let ids = stmt
            .query_map(params![parent_id as i64], |row| rows::id(row, 0))
            .db_context("Failed to query ids")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch ids")?;
        Ok(ids)
    }

    /// Fills the ordered id lists of a freshly decoded plan.
    fn attach_plan_ids(conn: &Connection, plan: &mut Plan) -> Result<()> {
        plan.phase_ids = Self::query_ids(conn, SELECT_PHASE_IDS_SQL, plan.id)?;
        plan.sub_plan_ids = Self::query_ids(conn, SELECT_SUB_PLAN_IDS_SQL, plan.id)?;
        Ok(())
    }

    /// Loads a plan with its id lists but without phases.
    pub(crate) fn fetch_plan(conn: &Connection, id: u64) -> Result<Option<Plan>> {
        let plan = conn
            .query_row(SELECT_PLAN_SQL, params![id as i64], Self::build_plan_from_row)
            .optional()
            .db_context("Failed to query plan")?;

        match plan {
            Some(mut plan) => {
                Self::attach_plan_ids(conn, &mut plan)?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn plan_exists(conn: &Connection, id: u64) -> Result<bool> {
        conn.query_row(CHECK_PLAN_EXISTS_SQL, params![id as i64], |row| row.get(0))
            .db_context("Failed to check plan existence")
    }

    /// Creates a new plan in `planning` status. When a parent is given it
    /// must exist; the new plan then appears in the parent's sub-plan list.
    pub fn create_plan(&mut self, params: &CreatePlan) -> Result<Plan> {
        params.validate()?;
        let metadata = serde_json::to_string(&params.metadata)?;

        let tx = self.write_transaction()?;

        if let Some(parent_id) = params.parent_plan_id {
            if !Self::plan_exists(&tx, parent_id)? {
                return Err(WaypointError::PlanNotFound { id: parent_id });
            }
        }

        let now_str = Timestamp::now().to_string();
        tx.execute(
            INSERT_PLAN_SQL,
            params![
                &params.title,
                params.description.as_deref(),
                &params.goal,
                params.parent_plan_id.map(|id| id as i64),
                &params.user_id,
                &metadata,
                &now_str
            ],
        )
        .db_context("Failed to insert plan")?;

        let id = tx.last_insert_rowid() as u64;
        let plan = Self::fetch_plan(&tx, id)?.ok_or(WaypointError::PlanNotFound { id })?;

        tx.commit().db_context("Failed to commit transaction")?;

        Ok(plan)
    }

    /// Retrieves a plan by its ID (phases are not loaded).
    pub fn get_plan(&self, id: u64) -> Result<Option<Plan>> {
        Self::fetch_plan(&self.connection, id)
    }

    /// Retrieves a plan with its phases, each with its tasks and feedback.
    /// A plan without phases yields an empty phase list.
    pub fn get_plan_details(&self, id: u64) -> Result<Plan> {
        let mut plan =
            Self::fetch_plan(&self.connection, id)?.ok_or(WaypointError::PlanNotFound { id })?;
        plan.phases = self.get_phases(id)?;
        Ok(plan)
    }

    /// Lists a user's plans, most recently created first.
    pub fn list_plans(&self, filter: &PlanFilter) -> Result<Vec<Plan>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_USER_PLANS_SQL)
            .db_context("Failed to prepare query")?;

        let mut plans = stmt
            .query_map(
                params![&filter.user_id, filter.status.map(|s| s.as_str())],
                Self::build_plan_from_row,
            )
            .db_context("Failed to query plans")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch plans")?;

        for plan in &mut plans {
            Self::attach_plan_ids(&self.connection, plan)?;
        }

        Ok(plans)
    }

    /// Sets a plan's status. `completed` is refused: a plan only completes by
    /// advancing past its last phase.
    pub fn update_plan_status(&mut self, id: u64, status: PlanStatus) -> Result<Plan> {
        if status == PlanStatus::Completed {
            return Err(WaypointError::invalid_input(
                "status",
                "plans complete by advancing past their last phase",
            ));
        }

        let tx = self.write_transaction()?;

        let now_str = Timestamp::now().to_string();
        let rows_affected = tx
            .execute(
                UPDATE_PLAN_STATUS_SQL,
                params![status.as_str(), &now_str, id as i64],
            )
            .db_context("Failed to update plan status")?;

        if rows_affected == 0 {
            return Err(WaypointError::PlanNotFound { id });
        }

        let plan = Self::fetch_plan(&tx, id)?.ok_or(WaypointError::PlanNotFound { id })?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(plan)
    }

    /// Permanently deletes a plan: feedback, tasks, phases, then the plan.
    /// Sub-plans survive with their parent reference cleared.
    pub fn delete_plan(&mut self, id: u64) -> Result<()> {
        let tx = self.write_transaction()?;

        if !Self::plan_exists(&tx, id)? {
            return Err(WaypointError::PlanNotFound { id });
        }

        tx.execute(DELETE_PLAN_FEEDBACK_SQL, params![id as i64])
            .db_context("Failed to delete plan feedback")?;
        tx.execute(DELETE_PLAN_TASKS_SQL, params![id as i64])
            .db_context("Failed to delete plan tasks")?;
        tx.execute(CLEAR_CURRENT_PHASE_SQL, params![id as i64])
            .db_context("Failed to clear current phase")?;
        tx.execute(DELETE_PLAN_PHASES_SQL, params![id as i64])
            .db_context("Failed to delete plan phases")?;

        let now_str = Timestamp::now().to_string();
        tx.execute(DETACH_SUB_PLANS_SQL, params![&now_str, id as i64])
            .db_context("Failed to detach sub-plans")?;
        tx.execute(DELETE_PLAN_SQL, params![id as i64])
            .db_context("Failed to delete plan")?;

        tx.commit().db_context("Failed to commit transaction")?;

        Ok(())
    }
}
