//! External collaborators consulted by the execution loop.
//!
//! The loop does not know how plans are generated or how lessons are
//! learned; it calls a [`Planner`] before each attempt, a [`Learner`] after
//! each attempt and a [`Verifier`] to decide whether an attempt achieved
//! its goal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::job::{AttemptOutcome, Job, SubtaskPlan, SubtaskResult};
use crate::error::Result;

/// Turns a goal into a sequence of tool invocations.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn generate_plan(&self, goal: &str, context: &Map<String, Value>)
        -> Result<SubtaskPlan>;
}

/// Guidance returned after an attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub lessons: Vec<String>,
    pub should_retry: bool,
    /// Merged into the job context before the next attempt
    #[serde(default)]
    pub alternative_approach: Option<Value>,
}

/// Learns from attempt outcomes and suggests how to retry.
#[async_trait]
pub trait Learner: Send + Sync {
    async fn learn_from_experience(
        &self,
        job: &Job,
        outcome: &AttemptOutcome,
        success: bool,
    ) -> Result<Lesson>;
}

/// Decides whether an attempt's results satisfy the job.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, job: &Job, results: &[SubtaskResult]) -> Result<bool>;
}

/// Accepts an attempt iff every executed subtask succeeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllSubtasksSucceeded;

#[async_trait]
impl Verifier for AllSubtasksSucceeded {
    async fn verify(&self, _job: &Job, results: &[SubtaskResult]) -> Result<bool> {
        Ok(results.iter().all(SubtaskResult::succeeded))
    }
}
