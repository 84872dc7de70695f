//! Typed lifecycle events emitted by the execution loop.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Something that happened to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoopEvent {
    JobQueued { job_id: u64 },
    JobStarted { job_id: u64, attempt: u32 },
    SubtaskCompleted { job_id: u64, subtask_id: String },
    SubtaskFailed { job_id: u64, subtask_id: String, message: String },
    JobCompleted { job_id: u64 },
    JobRetrying { job_id: u64, retries: u32, error: String },
    JobFailed { job_id: u64, error: String },
}

/// Receives loop events. Called inline from the loop, so implementations
/// must not block.
pub trait LoopObserver: Send + Sync {
    fn on_event(&self, event: &LoopEvent);
}

impl LoopObserver for mpsc::UnboundedSender<LoopEvent> {
    fn on_event(&self, event: &LoopEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(event.clone());
    }
}
