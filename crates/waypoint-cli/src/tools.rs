//! Built-in tools available to `wp run`.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use tokio::process::Command;
use waypoint_core::execution::{FailureKind, Tool, ToolOutcome, ToolRegistry};

/// Registry with `echo` and `shell`.
pub fn builtin_tools() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register("echo", Arc::new(EchoTool));
    tools.register("shell", Arc::new(ShellTool));
    tools
}

/// Succeeds with its params, or with `params.message` when present.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    async fn execute(&self, params: &Value) -> ToolOutcome {
        let data = params.get("message").unwrap_or(params).clone();
        println!("{}", data.as_str().map_or_else(|| data.to_string(), str::to_string));
        ToolOutcome::success(data)
    }
}

/// Runs `params.command` through `sh -c`, optionally bounded by
/// `params.timeout_ms`. A non-zero exit status is a failure.
pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    async fn execute(&self, params: &Value) -> ToolOutcome {
        let Some(command) = params.get("command").and_then(Value::as_str) else {
            return ToolOutcome::failure(
                FailureKind::InvalidParams,
                "shell needs a string `command` param",
            );
        };
        debug!("Running shell command: {command}");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).kill_on_drop(true);
        let output = cmd.output();

        let output = match params.get("timeout_ms").and_then(Value::as_u64) {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), output).await {
                Ok(output) => output,
                Err(_) => {
                    return ToolOutcome::failure(
                        FailureKind::Timeout,
                        format!("`{command}` did not finish within {ms}ms"),
                    );
                }
            },
            None => output.await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ToolOutcome::failure(
                    FailureKind::Execution,
                    format!("failed to spawn `{command}`: {e}"),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            return ToolOutcome::success(json!({
                "stdout": stdout,
                "stderr": stderr,
                "status": output.status.code(),
            }));
        }

        let reason = match output.status.code() {
            Some(code) => format!("`{command}` exited with status {code}"),
            None => format!("`{command}` was terminated by a signal"),
        };
        let stderr = stderr.trim();
        ToolOutcome::failure(
            FailureKind::Execution,
            if stderr.is_empty() {
                reason
            } else {
                format!("{reason}: {stderr}")
            },
        )
    }
}
