//! Planner and learner used by `wp run`.

use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use waypoint_core::{
    execution::{AttemptOutcome, Job, Learner, Lesson, Planner, Subtask, SubtaskPlan},
    Result, WaypointError,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum SubtaskFile {
    Plan(SubtaskPlan),
    List(Vec<Subtask>),
}

/// Reads the subtask plan from a JSON file on every attempt, so the file
/// can be fixed between retries.
pub struct FilePlanner {
    path: PathBuf,
}

impl FilePlanner {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Planner for FilePlanner {
    async fn generate_plan(&self, goal: &str, context: &Map<String, Value>) -> Result<SubtaskPlan> {
        if let Some(last_error) = context.get("last_error") {
            info!("Re-planning '{goal}' after: {last_error}");
        }

        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| WaypointError::FileSystem {
                path: self.path.clone(),
                source,
            })?;

        let plan = match serde_json::from_str(&raw) {
            Ok(SubtaskFile::Plan(plan)) => plan,
            Ok(SubtaskFile::List(subtasks)) => SubtaskPlan {
                subtasks,
                ..Default::default()
            },
            Err(e) => {
                return Err(WaypointError::Collaborator {
                    component: "planner",
                    message: format!("{}: {e}", self.path.display()),
                });
            }
        };
        debug!("Loaded {} subtask(s) from {}", plan.subtasks.len(), self.path.display());
        Ok(plan)
    }
}

/// Hands the last error back to the planner as `last_error`.
pub struct ErrorForwardingLearner;

#[async_trait]
impl Learner for ErrorForwardingLearner {
    async fn learn_from_experience(
        &self,
        job: &Job,
        outcome: &AttemptOutcome,
        success: bool,
    ) -> Result<Lesson> {
        match outcome {
            AttemptOutcome::Error(error) if !success => Ok(Lesson {
                lessons: vec![format!("attempt {} failed: {error}", job.attempt())],
                should_retry: true,
                alternative_approach: Some(json!({ "last_error": error })),
            }),
            _ => Ok(Lesson {
                lessons: vec![format!("succeeded on attempt {}", job.attempt())],
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_file_planner_accepts_both_layouts() {
        let mut list = NamedTempFile::new().unwrap();
        write!(list, r#"[{{"id": "1", "title": "hi", "tool": "echo"}}]"#).unwrap();
        let plan = FilePlanner::new(list.path().to_path_buf())
            .generate_plan("goal", &Map::new())
            .await
            .unwrap();
        assert_eq!(plan.subtasks.len(), 1);
        assert!(plan.subtasks[0].critical);

        let mut object = NamedTempFile::new().unwrap();
        write!(
            object,
            r#"{{"subtasks": [{{"id": "1", "title": "hi", "tool": "echo"}}], "risks": ["none"]}}"#
        )
        .unwrap();
        let plan = FilePlanner::new(object.path().to_path_buf())
            .generate_plan("goal", &Map::new())
            .await
            .unwrap();
        assert_eq!(plan.risks, vec!["none"]);
    }

    #[tokio::test]
    async fn test_file_planner_errors() {
        let missing = FilePlanner::new(PathBuf::from("/nonexistent/subtasks.json"))
            .generate_plan("goal", &Map::new())
            .await;
        assert!(matches!(missing, Err(WaypointError::FileSystem { .. })));

        let mut garbage = NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        let invalid = FilePlanner::new(garbage.path().to_path_buf())
            .generate_plan("goal", &Map::new())
            .await;
        assert!(matches!(
            invalid,
            Err(WaypointError::Collaborator {
                component: "planner",
                ..
            })
        ));
    }
}
