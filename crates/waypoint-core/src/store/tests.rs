//! Tests for the plan store.

use super::*;
use crate::{
    models::{PhaseAdvance, PlanStatus, WorkStatus},
    params::{
        AddFeedback, CreatePhase, CreatePlan, CreateTask, ListPlans, RecordRetry, UpdatePlanStatus,
        UpdateStatus, UpdateTask,
    },
};
use tempfile::TempDir;

/// Helper function to create a test store
async fn create_test_store() -> (TempDir, PlanStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let store = PlanStoreBuilder::new()
        .with_database_path(Some(&db_path))
        .build()
        .await
        .expect("Failed to create store");
    (temp_dir, store)
}

fn plan_params(title: &str, user_id: &str) -> CreatePlan {
    CreatePlan {
        title: title.to_string(),
        goal: "goal".to_string(),
        user_id: user_id.to_string(),
        ..Default::default()
    }
}

fn phase_params(plan_id: u64, title: &str, order: i64) -> CreatePhase {
    CreatePhase {
        plan_id,
        title: title.to_string(),
        description: None,
        order,
    }
}

fn task_params(phase_id: u64, title: &str) -> CreateTask {
    CreateTask {
        phase_id,
        title: title.to_string(),
        priority: Some("medium".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_feedback_and_retry_bookkeeping_scenario() {
    let (_temp_dir, store) = create_test_store().await;

    let plan = store
        .create_plan(&plan_params("Test Plan", "u1"))
        .await
        .expect("Failed to create plan");
    assert_eq!(plan.status, PlanStatus::Planning);

    let phase = store
        .add_phase(&phase_params(plan.id, "Execution", 1))
        .await
        .expect("Failed to add phase");
    let phase = store
        .start_phase(phase.id)
        .await
        .expect("Failed to start phase");
    assert_eq!(phase.status, WorkStatus::InProgress);

    let task = store
        .add_task(&task_params(phase.id, "Step 1"))
        .await
        .expect("Failed to add task");

    let set_status = |status: &str| UpdateStatus {
        id: task.id,
        status: status.to_string(),
    };
    let feedback = |message: &str, attempt: u32| AddFeedback {
        id: task.id,
        message: message.to_string(),
        attempt,
        details: None,
    };
    let retry = RecordRetry {
        id: task.id,
        last_attempt_status: "failed".to_string(),
    };

    store.update_task_status(&set_status("in_progress")).await.unwrap();
    store.add_task_feedback(&feedback("failed", 1)).await.unwrap();
    store.increment_task_retry(&retry).await.unwrap();
    store.update_task_status(&set_status("failed")).await.unwrap();
    store.add_task_feedback(&feedback("failed again", 2)).await.unwrap();
    let task = store.increment_task_retry(&retry).await.unwrap();

    assert_eq!(task.feedback.len(), 2);
    assert_eq!(task.feedback[0].message, "failed");
    assert_eq!(task.feedback[1].attempt, 2);
    assert_eq!(task.retry_count, 2);
    assert_eq!(task.last_attempt_status, Some(WorkStatus::Failed));

    let details = store
        .get_plan_details(plan.id)
        .await
        .expect("Failed to get plan details");
    assert_eq!(details.status, PlanStatus::Active);
    assert_eq!(details.current_phase_id, Some(phase.id));
    assert_eq!(details.phases.len(), 1);
    assert_eq!(details.phases[0].task_ids, vec![task.id]);
    assert_eq!(details.phases[0].tasks[0].id, task.id);
    assert_eq!(details.phases[0].tasks[0].status, WorkStatus::Failed);
}

#[tokio::test]
async fn test_plan_details_with_zero_phases() {
    let (_temp_dir, store) = create_test_store().await;

    let plan = store.create_plan(&plan_params("Empty", "u1")).await.unwrap();
    let details = store.get_plan_details(plan.id).await.unwrap();
    assert!(details.phases.is_empty());
    assert!(details.phase_ids.is_empty());

    let missing = store.get_plan_details(9999).await;
    assert!(matches!(missing, Err(WaypointError::PlanNotFound { id: 9999 })));
}

#[tokio::test]
async fn test_progress_of_empty_plan_is_zero() {
    let (_temp_dir, store) = create_test_store().await;

    let plan = store.create_plan(&plan_params("Empty", "u1")).await.unwrap();
    let progress = store.get_plan_progress(plan.id).await.unwrap();

    assert_eq!(progress.phase_progress.total, 0);
    assert_eq!(progress.phase_progress.completed, 0);
    assert_eq!(progress.phase_progress.percentage, 0);
    assert_eq!(progress.task_progress.total, 0);
    assert_eq!(progress.task_progress.percentage, 0);
}

#[tokio::test]
async fn test_progress_counts_completed_work() {
    let (_temp_dir, store) = create_test_store().await;

    let plan = store.create_plan(&plan_params("Build", "u1")).await.unwrap();
    let first = store.add_phase(&phase_params(plan.id, "one", 1)).await.unwrap();
    store.add_phase(&phase_params(plan.id, "two", 2)).await.unwrap();

    let tasks = [
        store.add_task(&task_params(first.id, "a")).await.unwrap(),
        store.add_task(&task_params(first.id, "b")).await.unwrap(),
        store.add_task(&task_params(first.id, "c")).await.unwrap(),
    ];
    store.start_task(tasks[0].id).await.unwrap();
    let done = store.complete_task(tasks[0].id).await.unwrap();
    assert!(done.actual_duration.is_some());
    assert!(done.completed_at.is_some());

    store.start_phase(first.id).await.unwrap();
    store.complete_phase(first.id).await.unwrap();

    let progress = store.get_plan_progress(plan.id).await.unwrap();
    assert_eq!(progress.phase_progress.completed, 1);
    assert_eq!(progress.phase_progress.total, 2);
    assert_eq!(progress.phase_progress.percentage, 50);
    assert_eq!(progress.task_progress.completed, 1);
    assert_eq!(progress.task_progress.total, 3);
    assert_eq!(progress.task_progress.percentage, 33);

    assert!(matches!(
        store.get_plan_progress(4242).await,
        Err(WaypointError::PlanNotFound { id: 4242 })
    ));
}

#[tokio::test]
async fn test_advance_on_last_phase_completes_plan() {
    let (_temp_dir, store) = create_test_store().await;

    let plan = store.create_plan(&plan_params("Release", "u1")).await.unwrap();
    let second = store.add_phase(&phase_params(plan.id, "deploy", 2)).await.unwrap();
    let first = store.add_phase(&phase_params(plan.id, "build", 1)).await.unwrap();

    match store.advance_to_next_phase(plan.id).await.unwrap() {
        PhaseAdvance::Started { phase } => assert_eq!(phase.id, first.id),
        other => panic!("expected first phase to start, got {other:?}"),
    }
    store.complete_phase(first.id).await.unwrap();

    match store.advance_to_next_phase(plan.id).await.unwrap() {
        PhaseAdvance::Started { phase } => assert_eq!(phase.id, second.id),
        other => panic!("expected second phase to start, got {other:?}"),
    }

    match store.advance_to_next_phase(plan.id).await.unwrap() {
        PhaseAdvance::PlanCompleted { plan } => {
            assert_eq!(plan.status, PlanStatus::Completed);
            assert_eq!(plan.current_phase_id, Some(second.id));
        }
        other => panic!("expected plan completion, got {other:?}"),
    }

    // The last phase was left running: no further start happened.
    let last = store.get_phase(second.id).await.unwrap().unwrap();
    assert_eq!(last.status, WorkStatus::InProgress);

    assert!(matches!(
        store.advance_to_next_phase(777).await,
        Err(WaypointError::PlanNotFound { id: 777 })
    ));
}

#[tokio::test]
async fn test_delete_plan_leaves_no_residue() {
    let (temp_dir, store) = create_test_store().await;

    let parent = store.create_plan(&plan_params("Parent", "u1")).await.unwrap();
    let child = store
        .create_plan(&CreatePlan {
            parent_plan_id: Some(parent.id),
            ..plan_params("Child", "u1")
        })
        .await
        .unwrap();

    let phase = store.add_phase(&phase_params(parent.id, "p", 0)).await.unwrap();
    let task = store.add_task(&task_params(phase.id, "t")).await.unwrap();
    store.start_phase(phase.id).await.unwrap();
    store
        .add_task_feedback(&AddFeedback {
            id: task.id,
            message: "note".to_string(),
            attempt: 1,
            details: Some(serde_json::json!({"exit": 1})),
        })
        .await
        .unwrap();

    store.delete_plan(parent.id).await.expect("Failed to delete plan");

    assert!(store.get_plan(parent.id).await.unwrap().is_none());
    assert!(store.get_phase(phase.id).await.unwrap().is_none());
    assert!(store.get_task(task.id).await.unwrap().is_none());

    let conn = rusqlite::Connection::open(temp_dir.path().join("test.db")).unwrap();
    let residue: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM phases WHERE plan_id = ?1) + (SELECT COUNT(*) FROM feedback)",
            [parent.id as i64],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(residue, 0);

    let orphan = store.get_plan(child.id).await.unwrap().unwrap();
    assert_eq!(orphan.parent_plan_id, None);

    assert!(matches!(
        store.delete_plan(parent.id).await,
        Err(WaypointError::PlanNotFound { .. })
    ));
}

#[tokio::test]
async fn test_sub_plans_are_listed_on_parent() {
    let (_temp_dir, store) = create_test_store().await;

    let parent = store.create_plan(&plan_params("Parent", "u1")).await.unwrap();
    let a = store
        .create_plan(&CreatePlan {
            parent_plan_id: Some(parent.id),
            ..plan_params("A", "u1")
        })
        .await
        .unwrap();
    let b = store
        .create_plan(&CreatePlan {
            parent_plan_id: Some(parent.id),
            ..plan_params("B", "u1")
        })
        .await
        .unwrap();

    let parent = store.get_plan(parent.id).await.unwrap().unwrap();
    assert_eq!(parent.sub_plan_ids, vec![a.id, b.id]);

    let dangling = store
        .create_plan(&CreatePlan {
            parent_plan_id: Some(31337),
            ..plan_params("Lost", "u1")
        })
        .await;
    assert!(matches!(dangling, Err(WaypointError::PlanNotFound { id: 31337 })));
}

#[tokio::test]
async fn test_list_user_plans_newest_first() {
    let (_temp_dir, store) = create_test_store().await;

    let first = store.create_plan(&plan_params("first", "u1")).await.unwrap();
    let second = store.create_plan(&plan_params("second", "u1")).await.unwrap();
    store.create_plan(&plan_params("other", "u2")).await.unwrap();

    let plans = store
        .list_user_plans(&ListPlans {
            user_id: "u1".to_string(),
            status: None,
        })
        .await
        .unwrap();
    let ids: Vec<u64> = plans.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    store
        .update_plan_status(&UpdatePlanStatus {
            id: first.id,
            status: "failed".to_string(),
        })
        .await
        .unwrap();
    let failed = store
        .list_user_plans(&ListPlans {
            user_id: "u1".to_string(),
            status: Some("failed".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, first.id);
}

#[tokio::test]
async fn test_plan_status_cannot_be_set_to_completed() {
    let (_temp_dir, store) = create_test_store().await;
    let plan = store.create_plan(&plan_params("p", "u1")).await.unwrap();

    let result = store
        .update_plan_status(&UpdatePlanStatus {
            id: plan.id,
            status: "completed".to_string(),
        })
        .await;
    assert!(matches!(result, Err(WaypointError::InvalidInput { .. })));

    let bogus = store
        .update_plan_status(&UpdatePlanStatus {
            id: plan.id,
            status: "paused".to_string(),
        })
        .await;
    assert!(matches!(bogus, Err(WaypointError::InvalidStatus { .. })));
}

#[tokio::test]
async fn test_invalid_status_and_transitions() {
    let (_temp_dir, store) = create_test_store().await;
    let plan = store.create_plan(&plan_params("p", "u1")).await.unwrap();
    let phase = store.add_phase(&phase_params(plan.id, "p", 0)).await.unwrap();
    let task = store.add_task(&task_params(phase.id, "t")).await.unwrap();

    let invalid = store
        .update_task_status(&UpdateStatus {
            id: task.id,
            status: "done".to_string(),
        })
        .await;
    assert!(matches!(
        invalid,
        Err(WaypointError::InvalidStatus { value }) if value == "done"
    ));

    // complete requires in_progress
    let premature = store.complete_task(task.id).await;
    assert!(matches!(
        premature,
        Err(WaypointError::InvalidTransition { action: "complete", .. })
    ));

    let started = store.start_task(task.id).await.unwrap();
    let first_start = started.started_at;
    store
        .update_task_status(&UpdateStatus {
            id: task.id,
            status: "failed".to_string(),
        })
        .await
        .unwrap();

    // failed re-enters in_progress, keeping the first start time
    let restarted = store.start_task(task.id).await.unwrap();
    assert_eq!(restarted.status, WorkStatus::InProgress);
    assert_eq!(restarted.started_at, first_start);

    let completed = store.complete_task(task.id).await.unwrap();
    assert!(matches!(
        store.start_task(completed.id).await,
        Err(WaypointError::InvalidTransition { action: "start", .. })
    ));

    assert!(matches!(
        store.start_task(12345).await,
        Err(WaypointError::TaskNotFound { id: 12345 })
    ));
    assert!(matches!(
        store.add_task(&task_params(999, "orphan")).await,
        Err(WaypointError::PhaseNotFound { id: 999 })
    ));
}

#[tokio::test]
async fn test_feedback_accepted_in_any_status() {
    let (_temp_dir, store) = create_test_store().await;
    let plan = store.create_plan(&plan_params("p", "u1")).await.unwrap();
    let phase = store.add_phase(&phase_params(plan.id, "p", 0)).await.unwrap();

    store.start_phase(phase.id).await.unwrap();
    store.complete_phase(phase.id).await.unwrap();

    let phase = store
        .add_phase_feedback(&AddFeedback {
            id: phase.id,
            message: "post-mortem".to_string(),
            attempt: 1,
            details: None,
        })
        .await
        .unwrap();
    assert_eq!(phase.status, WorkStatus::Completed);
    assert_eq!(phase.feedback.len(), 1);

    let phase = store
        .increment_phase_retry(&RecordRetry {
            id: phase.id,
            last_attempt_status: "completed".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(phase.retry_count, 1);
    assert_eq!(phase.last_attempt_status, Some(WorkStatus::Completed));
}

#[tokio::test]
async fn test_update_task_details_with_version_guard() {
    let (_temp_dir, store) = create_test_store().await;
    let plan = store.create_plan(&plan_params("p", "u1")).await.unwrap();
    let phase = store.add_phase(&phase_params(plan.id, "p", 0)).await.unwrap();
    let task = store.add_task(&task_params(phase.id, "t")).await.unwrap();

    let updated = store
        .update_task(UpdateTask {
            id: task.id,
            priority: Some("high".to_string()),
            estimated_duration: Some(90),
            expected_version: Some(task.version),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.priority, crate::models::Priority::High);
    assert_eq!(updated.estimated_duration, Some(90));
    assert_eq!(updated.title, "t");

    let stale = store
        .update_task(UpdateTask {
            id: task.id,
            title: Some("renamed".to_string()),
            expected_version: Some(task.version),
            ..Default::default()
        })
        .await;
    assert!(matches!(stale, Err(WaypointError::VersionConflict { .. })));
}
