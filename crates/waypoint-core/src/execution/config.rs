//! Execution loop tuning.

use std::time::Duration;

/// Retry and polling settings for an [`ExecutionLoop`](super::ExecutionLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Failed attempts retried before a job is marked failed
    pub max_retries: u32,
    /// Wait between a failed attempt and its re-queue
    pub retry_delay: Duration,
    /// Idle polling cadence of the background loop
    pub poll_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl LoopConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
