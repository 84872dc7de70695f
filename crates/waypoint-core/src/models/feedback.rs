//! Attempt feedback attached to phases and tasks.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded observation about an attempt. Never mutated once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub message: String,
    pub attempt: u32,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
