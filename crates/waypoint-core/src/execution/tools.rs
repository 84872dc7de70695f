//! Named capabilities dispatched by the execution loop.
//!
//! A [`Tool`] never raises: every outcome, including bad parameters or a
//! crashed process, comes back as a [`ToolOutcome`]. The registry itself
//! adds no retries, timeouts or parameter validation.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a tool invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Parameters were missing or malformed
    InvalidParams,
    /// The tool ran and reported failure
    Execution,
    /// The tool gave up waiting on something
    Timeout,
    /// Anything else
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::InvalidParams => "invalid params",
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { data: Value },
    Failure { kind: FailureKind, message: String },
}

impl ToolOutcome {
    pub fn success(data: Value) -> Self {
        ToolOutcome::Success { data }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }
}

/// A capability the execution loop can dispatch subtasks to.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool with the subtask's parameters.
    async fn execute(&self, params: &Value) -> ToolOutcome;
}

/// Name → tool map.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(name.into(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(ToolOutcome);

    #[async_trait]
    impl Tool for Constant {
        async fn execute(&self, _params: &Value) -> ToolOutcome {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.register(
            "ok",
            Arc::new(Constant(ToolOutcome::success(json!({"n": 1})))),
        );
        registry.register(
            "broken",
            Arc::new(Constant(ToolOutcome::failure(FailureKind::Execution, "boom"))),
        );

        assert_eq!(registry.names(), vec!["broken", "ok"]);
        assert!(registry.get("missing").is_none());

        let ok = registry.get("ok").unwrap().execute(&json!({})).await;
        assert!(ok.is_success());

        let broken = registry.get("broken").unwrap().execute(&json!({})).await;
        assert_eq!(
            broken,
            ToolOutcome::Failure {
                kind: FailureKind::Execution,
                message: "boom".to_string()
            }
        );
    }
}
