//! Jobs and the subtask plans that drive them.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tools::ToolOutcome;

/// Lifecycle of a job.
///
/// `queued → running → {completed | retrying → queued | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    /// Waiting out the retry delay before re-entering the queue
    Retrying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Retrying => "retrying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

fn default_critical() -> bool {
    true
}

/// One tool invocation proposed by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    /// Registry name of the tool to dispatch to
    pub tool: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub reasoning: String,
    /// A failed critical subtask aborts the rest of the plan
    #[serde(default = "default_critical")]
    pub critical: bool,
}

/// Planner output for one attempt of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskPlan {
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Recorded outcome of one executed subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub subtask_id: String,
    pub title: String,
    pub tool: String,
    pub critical: bool,
    /// 1-based attempt of the job this result belongs to
    pub attempt: u32,
    pub outcome: ToolOutcome,
}

impl SubtaskResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// What an attempt produced, as handed to the learner.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Every subtask result of a successful attempt
    Results(Vec<SubtaskResult>),
    /// Why the attempt failed
    Error(String),
}

/// A queued unit of autonomous execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub goal: String,
    /// Planner input; grows with alternative approaches between retries
    pub context: Map<String, Value>,
    pub status: JobStatus,
    /// Retries consumed so far
    pub retries: u32,
    /// Plan of the latest attempt
    pub plan: Option<SubtaskPlan>,
    /// Results of the latest attempt
    pub results: Vec<SubtaskResult>,
    /// Failure message of the latest failed attempt
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,

    /// Journal plan mirroring this job, when a journal is configured
    pub plan_id: Option<u64>,
    pub phase_id: Option<u64>,
    /// Journal task per subtask id
    #[serde(default)]
    pub task_ids: HashMap<String, u64>,
}

impl Job {
    pub(crate) fn new(id: u64, goal: String, context: Map<String, Value>) -> Self {
        Self {
            id,
            goal,
            context,
            status: JobStatus::Queued,
            retries: 0,
            plan: None,
            results: Vec::new(),
            error: None,
            created_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            plan_id: None,
            phase_id: None,
            task_ids: HashMap::new(),
        }
    }

    /// 1-based number of the attempt currently running or last run.
    pub fn attempt(&self) -> u32 {
        self.retries + 1
    }

    /// Folds a learner's alternative approach into the planner context.
    /// Objects are merged key by key; anything else is stored under
    /// `alternative_approach`.
    pub(crate) fn merge_alternative(&mut self, approach: Value) {
        match approach {
            Value::Object(fields) => self.context.extend(fields),
            other => {
                self.context
                    .insert("alternative_approach".to_string(), other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subtask_critical_defaults_to_true() {
        let subtask: Subtask = serde_json::from_value(json!({
            "id": "s1",
            "title": "say hi",
            "tool": "echo",
        }))
        .unwrap();
        assert!(subtask.critical);
        assert_eq!(subtask.params, Value::Null);

        let optional: Subtask = serde_json::from_value(json!({
            "id": "s2",
            "title": "lint",
            "tool": "shell",
            "params": {"command": "true"},
            "critical": false,
        }))
        .unwrap();
        assert!(!optional.critical);
    }

    #[test]
    fn test_merge_alternative_approach() {
        let mut job = Job::new(1, "goal".into(), Map::new());
        job.merge_alternative(json!({"strategy": "smaller steps", "depth": 2}));
        assert_eq!(job.context["strategy"], json!("smaller steps"));
        assert_eq!(job.context["depth"], json!(2));

        job.merge_alternative(json!("use the cache"));
        assert_eq!(job.context["alternative_approach"], json!("use the cache"));
        assert_eq!(job.context.len(), 3);
    }
}
