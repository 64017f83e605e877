//! Backend that delegates merges to an external program
//!
//! The request is written to the program's stdin as JSON. On success the
//! program prints its result messages to stdout, either as a JSON array or
//! as plain lines.

use super::{MergeBackend, MergeRequest};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Merge backend driving an external merge program
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    /// Create a backend for `program` invoked with `args`
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program this backend runs
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl MergeBackend for CommandBackend {
    async fn run_merge(&self, request: &MergeRequest) -> Result<Vec<Value>> {
        if request.primary_model.is_empty() || request.secondary_model.is_empty() {
            return Err(Error::Backend(
                "primary and secondary models are required".to_string(),
            ));
        }

        let payload = serde_json::to_vec(request)
            .map_err(|e| Error::Internal(format!("failed to encode merge request: {e}")))?;

        debug!(program = %self.program, method = %request.method, "spawning merge backend");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Backend(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            // Close stdin so the program sees EOF
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(Error::Backend(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = stdout.len(), "merge backend finished");
        Ok(parse_stdout(&stdout))
    }
}

/// Interpret backend stdout as a JSON array, or one message per line
fn parse_stdout(stdout: &str) -> Vec<Value> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(stdout.trim()) {
        return items;
    }
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Value::String(line.to_string()))
        .collect()
}
