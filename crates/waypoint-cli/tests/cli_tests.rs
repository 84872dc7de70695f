use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper function to create a temporary directory for CLI tests
fn create_cli_test_environment() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Helper function to create a `wp` Command bound to a test database
fn wp_cmd(db_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wp").expect("Failed to find wp binary");
    cmd.arg("--no-color")
        .arg("--database-file")
        .arg(db_path);
    cmd
}

fn create_plan(db_path: &Path, title: &str) {
    wp_cmd(db_path)
        .args(["plan", "create", title, "--goal", "ship it"])
        .assert()
        .success();
}

#[test]
fn test_cli_create_plan() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    wp_cmd(&db_path)
        .args([
            "plan",
            "create",
            "Release",
            "--goal",
            "Ship 1.0",
            "--description",
            "Everything needed for the release",
            "--metadata",
            r#"{"team": "core"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created plan with ID: 1"))
        .stdout(predicate::str::contains("# 1. Release"))
        .stdout(predicate::str::contains("- Status: planning"))
        .stdout(predicate::str::contains("Everything needed for the release"))
        .stdout(predicate::str::contains("No phases in this plan."));
}

#[test]
fn test_cli_create_plan_rejects_bad_metadata() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    wp_cmd(&db_path)
        .args(["plan", "create", "Bad", "--goal", "g", "--metadata", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn test_cli_list_plans_scoped_to_user() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    wp_cmd(&db_path)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plans found."));

    wp_cmd(&db_path)
        .args(["--user", "alice", "plan", "create", "Alice's plan", "--goal", "g"])
        .assert()
        .success();

    wp_cmd(&db_path)
        .args(["--user", "alice", "plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Alice's plan (ID: 1) [planning]"));

    wp_cmd(&db_path)
        .args(["--user", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plans found."));
}

#[test]
fn test_cli_phase_and_task_lifecycle() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_plan(&db_path, "Lifecycle");

    wp_cmd(&db_path)
        .args(["phase", "add", "1", "Build", "--order", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created phase with ID: 1"));

    wp_cmd(&db_path)
        .args(["task", "add", "1", "Compile", "--priority", "high", "--estimate", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task with ID: 1"))
        .stdout(predicate::str::contains("- Priority: high"));

    wp_cmd(&db_path)
        .args(["plan", "advance", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started phase 1 of plan 1"));

    wp_cmd(&db_path)
        .args(["task", "start", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started task with ID: 1"));

    wp_cmd(&db_path)
        .args(["task", "complete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed task with ID: 1"));

    wp_cmd(&db_path)
        .args(["phase", "complete", "1"])
        .assert()
        .success();

    wp_cmd(&db_path)
        .args(["plan", "advance", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan 1 completed"));

    wp_cmd(&db_path)
        .args(["plan", "progress", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Phases: 1/1 (100%)"))
        .stdout(predicate::str::contains("- Tasks: 1/1 (100%)"));

    wp_cmd(&db_path)
        .args(["plan", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: completed"))
        .stdout(predicate::str::contains("### 1. Build"))
        .stdout(predicate::str::contains("#### 1. Compile"));
}

#[test]
fn test_cli_feedback_and_retry() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_plan(&db_path, "Retries");

    wp_cmd(&db_path)
        .args(["phase", "add", "1", "Only phase"])
        .assert()
        .success();
    wp_cmd(&db_path)
        .args(["task", "add", "1", "Flaky step"])
        .assert()
        .success();

    wp_cmd(&db_path)
        .args([
            "task",
            "feedback",
            "1",
            "network timeout",
            "--details",
            r#"{"host": "example.org"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added feedback to task with ID: 1"))
        .stdout(predicate::str::contains("network timeout"));

    wp_cmd(&db_path)
        .args(["task", "retry", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Retries: 1 (last attempt: failed)"));

    wp_cmd(&db_path)
        .args(["phase", "feedback", "1", "blocked on task 1", "--attempt", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Attempt 2"));
}

#[test]
fn test_cli_invalid_status_is_rejected() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_plan(&db_path, "Statuses");

    wp_cmd(&db_path)
        .args(["phase", "add", "1", "Phase"])
        .assert()
        .success();

    wp_cmd(&db_path)
        .args(["phase", "status", "1", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status: 'done'"));

    wp_cmd(&db_path)
        .args(["plan", "status", "1", "completed"])
        .assert()
        .failure();

    wp_cmd(&db_path)
        .args(["plan", "status", "1", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: failed"));
}

#[test]
fn test_cli_missing_entities() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    wp_cmd(&db_path)
        .args(["plan", "show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan with ID 42 not found"));

    wp_cmd(&db_path)
        .args(["task", "show", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task with ID 7 not found"));

    wp_cmd(&db_path)
        .args(["phase", "add", "42", "Orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan with ID 42 not found"));
}

#[test]
fn test_cli_delete_requires_confirmation() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_plan(&db_path, "Doomed");

    wp_cmd(&db_path)
        .args(["plan", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--confirm"));

    wp_cmd(&db_path)
        .args(["plan", "delete", "1", "--confirm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success: Deleted plan 1"));

    wp_cmd(&db_path)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No plans found."));
}

#[test]
fn test_cli_run_completes_goal() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    let subtasks = temp_dir.path().join("subtasks.json");
    fs::write(
        &subtasks,
        r#"[
            {"id": "greet", "title": "Say hello", "tool": "echo",
             "params": {"message": "hello from waypoint"}},
            {"id": "check", "title": "Check shell", "tool": "shell",
             "params": {"command": "true"}}
        ]"#,
    )
    .expect("Failed to write subtasks");

    wp_cmd(&db_path)
        .args(["run", "greet the world", "--subtasks"])
        .arg(&subtasks)
        .args(["--retry-delay-ms", "0", "--poll-interval-ms", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from waypoint"))
        .stdout(predicate::str::contains("# Job 1: greet the world"))
        .stdout(predicate::str::contains("- Status: completed"))
        .stdout(predicate::str::contains("### 1. Execution"));

    wp_cmd(&db_path)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Job 1 (ID: 1) [completed]"));
}

#[test]
fn test_cli_run_fails_after_retries() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    let subtasks = temp_dir.path().join("subtasks.json");
    fs::write(
        &subtasks,
        r#"{"subtasks": [
            {"id": "boom", "title": "Always fails", "tool": "shell",
             "params": {"command": "exit 1"}}
        ]}"#,
    )
    .expect("Failed to write subtasks");

    wp_cmd(&db_path)
        .args(["run", "doomed", "--subtasks"])
        .arg(&subtasks)
        .args([
            "--max-retries",
            "1",
            "--retry-delay-ms",
            "0",
            "--poll-interval-ms",
            "10",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("- Retries: 1"))
        .stderr(predicate::str::contains("Job 1 failed after 1 retries"));

    wp_cmd(&db_path)
        .args(["plan", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: failed"))
        .stdout(predicate::str::contains("exited with status 1"));
}
