//! Display implementations for domain models.
//!
//! Everything formats as markdown: plans as a top-level heading, phases one
//! level below and tasks below their phase, so a plan with details renders
//! as a single nested document.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::{
    execution::{Job, JobStatus, LoopStatus, ToolOutcome},
    models::{
        Feedback, Phase, PhaseAdvance, Plan, PlanProgress, PlanStatus, Priority, Progress, Task,
        WorkStatus,
    },
};

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_retries(
    f: &mut fmt::Formatter<'_>,
    retry_count: u32,
    last_attempt_status: Option<WorkStatus>,
) -> fmt::Result {
    if retry_count == 0 {
        return Ok(());
    }
    match last_attempt_status {
        Some(last) => writeln!(f, "- Retries: {retry_count} (last attempt: {last})"),
        None => writeln!(f, "- Retries: {retry_count}"),
    }
}

fn fmt_feedback(f: &mut fmt::Formatter<'_>, heading: &str, feedback: &[Feedback]) -> fmt::Result {
    if feedback.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{heading} Feedback")?;
    writeln!(f)?;
    for entry in feedback {
        write!(f, "- Attempt {}", entry.attempt)?;
        write!(f, " ({}): {}", LocalDateTime(&entry.timestamp), entry.message)?;
        if let Some(details) = &entry.details {
            write!(f, " `{details}`")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}. {}", self.id, self.title)?;
        writeln!(f)?;

        writeln!(f, "- Status: {}", self.status)?;
        writeln!(f, "- Goal: {}", self.goal)?;
        writeln!(f, "- Owner: {}", self.user_id)?;
        if let Some(parent) = self.parent_plan_id {
            writeln!(f, "- Parent plan: {parent}")?;
        }
        if !self.sub_plan_ids.is_empty() {
            writeln!(f, "- Sub-plans: {}", join_ids(&self.sub_plan_ids))?;
        }
        if let Some(current) = self.current_phase_id {
            writeln!(f, "- Current phase: {current}")?;
        }
        if !self.metadata.is_empty() {
            writeln!(f, "- Metadata: `{}`", serde_json::Value::Object(self.metadata.clone()))?;
        }
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if let Some(desc) = &self.description {
            writeln!(f)?;
            writeln!(f, "{desc}")?;
        }

        if self.phase_ids.is_empty() {
            return writeln!(f, "\nNo phases in this plan.");
        }

        if self.phases.is_empty() {
            writeln!(f, "- Phases: {}", join_ids(&self.phase_ids))?;
            return Ok(());
        }

        writeln!(f, "\n## Phases")?;
        writeln!(f)?;
        for phase in &self.phases {
            write!(f, "{phase}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {}. {} ({})",
            self.id,
            self.title,
            self.status.with_icon()
        )?;
        writeln!(f)?;

        writeln!(f, "- Plan: {}", self.plan_id)?;
        writeln!(f, "- Order: {}", self.order)?;
        fmt_retries(f, self.retry_count, self.last_attempt_status)?;
        if let Some(started) = &self.started_at {
            writeln!(f, "- Started: {}", LocalDateTime(started))?;
        }
        if let Some(completed) = &self.completed_at {
            writeln!(f, "- Completed: {}", LocalDateTime(completed))?;
        }
        if self.tasks.is_empty() && !self.task_ids.is_empty() {
            writeln!(f, "- Tasks: {}", join_ids(&self.task_ids))?;
        }

        if let Some(desc) = &self.description {
            writeln!(f)?;
            writeln!(f, "{desc}")?;
        }

        fmt_feedback(f, "####", &self.feedback)?;
        writeln!(f)?;

        for task in &self.tasks {
            write!(f, "{task}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "#### {}. {} ({})",
            self.id,
            self.title,
            self.status.with_icon()
        )?;
        writeln!(f)?;

        writeln!(f, "- Phase: {}", self.phase_id)?;
        writeln!(f, "- Priority: {}", self.priority)?;
        if let Some(estimate) = self.estimated_duration {
            writeln!(f, "- Estimated: {estimate}s")?;
        }
        if let Some(actual) = self.actual_duration {
            writeln!(f, "- Actual: {actual}s")?;
        }
        fmt_retries(f, self.retry_count, self.last_attempt_status)?;

        if let Some(desc) = &self.description {
            writeln!(f)?;
            writeln!(f, "{desc}")?;
        }

        fmt_feedback(f, "#####", &self.feedback)?;
        writeln!(f)?;
        Ok(())
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.completed, self.total, self.percentage)
    }
}

impl fmt::Display for PlanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Progress of plan {}", self.plan_id)?;
        writeln!(f)?;
        writeln!(f, "- Phases: {}", self.phase_progress)?;
        writeln!(f, "- Tasks: {}", self.task_progress)
    }
}

impl fmt::Display for PhaseAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseAdvance::Started { phase } => {
                writeln!(f, "Started phase {} of plan {}", phase.id, phase.plan_id)?;
                writeln!(f)?;
                write!(f, "{phase}")
            }
            PhaseAdvance::PlanCompleted { plan } => {
                writeln!(f, "Plan {} completed, no phase left", plan.id)?;
                writeln!(f)?;
                write!(f, "{plan}")
            }
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Job {}: {}", self.id, self.goal)?;
        writeln!(f)?;
        writeln!(f, "- Status: {}", self.status)?;
        writeln!(f, "- Retries: {}", self.retries)?;
        if let Some(plan_id) = self.plan_id {
            writeln!(f, "- Journal plan: {plan_id}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "- Last error: {error}")?;
        }

        if !self.results.is_empty() {
            writeln!(f, "\n## Subtasks")?;
            writeln!(f)?;
            for result in &self.results {
                let mark = if result.succeeded() { "✓" } else { "✗" };
                write!(f, "- {mark} {} `{}`", result.title, result.tool)?;
                if let ToolOutcome::Failure { message, .. } = &result.outcome {
                    write!(f, ": {message}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Execution loop")?;
        writeln!(f)?;
        writeln!(f, "- Running: {}", if self.running { "yes" } else { "no" })?;
        if let Some(job) = self.current_job {
            writeln!(f, "- Current job: {job}")?;
        }
        writeln!(f, "- Queued: {}", self.queued_tasks)?;
        writeln!(f, "- Completed: {}", self.completed_tasks)?;
        writeln!(f, "- Failed: {}", self.failed_tasks)?;
        writeln!(f, "- Success rate: {:.1}%", self.success_rate)
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::Map;

    use super::*;

    fn timestamp() -> Timestamp {
        Timestamp::from_second(1_640_995_200).unwrap()
    }

    fn task() -> Task {
        Task {
            id: 7,
            phase_id: 3,
            title: "Step 1".to_string(),
            description: None,
            status: WorkStatus::Failed,
            feedback: vec![Feedback {
                message: "failed again".to_string(),
                attempt: 2,
                timestamp: timestamp(),
                details: None,
            }],
            retry_count: 2,
            last_attempt_status: Some(WorkStatus::Failed),
            priority: Priority::Medium,
            estimated_duration: Some(60),
            actual_duration: None,
            started_at: Some(timestamp()),
            completed_at: None,
            version: 5,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[test]
    fn test_task_display() {
        let output = task().to_string();
        assert!(output.starts_with("#### 7. Step 1 (✗ Failed)"));
        assert!(output.contains("- Retries: 2 (last attempt: failed)"));
        assert!(output.contains("- Attempt 2"));
        assert!(output.contains("failed again"));
        assert!(output.contains("- Estimated: 60s"));
    }

    #[test]
    fn test_plan_display_nests_phases_and_tasks() {
        let phase = Phase {
            id: 3,
            plan_id: 1,
            title: "Execution".to_string(),
            description: None,
            order: 1,
            status: WorkStatus::InProgress,
            feedback: vec![],
            retry_count: 0,
            last_attempt_status: None,
            task_ids: vec![7],
            started_at: Some(timestamp()),
            completed_at: None,
            version: 2,
            created_at: timestamp(),
            updated_at: timestamp(),
            tasks: vec![task()],
        };
        let plan = Plan {
            id: 1,
            title: "Test Plan".to_string(),
            description: None,
            goal: "goal".to_string(),
            status: PlanStatus::Active,
            parent_plan_id: None,
            sub_plan_ids: vec![],
            phase_ids: vec![3],
            current_phase_id: Some(3),
            user_id: "u1".to_string(),
            metadata: Map::new(),
            version: 3,
            created_at: timestamp(),
            updated_at: timestamp(),
            phases: vec![phase],
        };

        let output = plan.to_string();
        assert!(output.starts_with("# 1. Test Plan"));
        assert!(output.contains("- Current phase: 3"));
        assert!(output.contains("## Phases"));
        assert!(output.contains("### 3. Execution (➤ In Progress)"));
        assert!(output.contains("#### 7. Step 1"));
    }

    #[test]
    fn test_loop_status_display() {
        let status = LoopStatus {
            running: false,
            current_job: None,
            queued_tasks: 1,
            completed_tasks: 2,
            failed_tasks: 1,
            success_rate: 200.0 / 3.0,
        };
        let output = status.to_string();
        assert!(output.contains("- Running: no"));
        assert!(output.contains("- Success rate: 66.7%"));
    }
}
