//! terminal tool - run a shell command inside the sandbox

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Tool, ToolContext, ToolResult};
use crate::error::Result;
use crate::sandbox::{OutputChunk, SandboxError};

pub struct TerminalTool;

#[derive(Debug, Default)]
struct Buffers {
    stdout: String,
    stderr: String,
}

fn command_failed(err: &SandboxError, buffers: &Buffers) -> ToolResult {
    ToolResult::error(format!(
        "Command failed: {} \nstdout: {}\nstderr: {}",
        err, buffers.stdout, buffers.stderr
    ))
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn description(&self) -> &'static str {
        "Use the terminal to run commands"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let Some(command) = input["command"].as_str() else {
            return Ok(ToolResult::error("Command failed: command is required"));
        };

        let sandbox = ctx.sandbox().await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = sandbox.exec(command, Some(&tx)).await;
        drop(tx);

        let mut buffers = Buffers::default();
        while let Ok(chunk) = rx.try_recv() {
            match chunk {
                OutputChunk::Stdout(data) => buffers.stdout.push_str(&data),
                OutputChunk::Stderr(data) => buffers.stderr.push_str(&data),
            }
        }

        match result {
            Ok(output) => Ok(ToolResult::success(output.stdout)),
            Err(e) => {
                log::debug!("[{}] command failed: {}: {}", ctx.sandbox_id, command, e);
                Ok(command_failed(&e, &buffers))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VibeError;
    use crate::llm::tools::test_support::context;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_terminal_returns_stdout() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let result = TerminalTool
            .execute(serde_json::json!({"command": "echo 'Hello, World!'"}), &ctx)
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content, "Hello, World!\n");
    }

    #[tokio::test]
    async fn test_terminal_runs_in_sandbox_root() {
        let temp = TempDir::new().unwrap();
        let (ctx, sandbox) = context(&temp).await;
        sandbox.write_file("marker.txt", "found").await.unwrap();

        let result = TerminalTool
            .execute(serde_json::json!({"command": "cat marker.txt"}), &ctx)
            .await
            .unwrap();

        assert_eq!(result.content, "found");
    }

    #[tokio::test]
    async fn test_failing_command_reports_error_and_partial_output() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let result = TerminalTool
            .execute(
                serde_json::json!({"command": "echo building; echo 'missing module' >&2; exit 1"}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.content.starts_with("Command failed: exit status 1"));
        assert!(result.content.contains("stdout: building\n"));
        assert!(result.content.contains("stderr: missing module\n"));
    }

    #[tokio::test]
    async fn test_lost_sandbox_aborts_instead_of_reporting() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;
        std::fs::remove_dir_all(temp.path().join("sandboxes").join(&ctx.sandbox_id)).unwrap();

        let result = TerminalTool.execute(serde_json::json!({"command": "true"}), &ctx).await;
        assert!(matches!(result, Err(VibeError::SandboxLost { .. })));
    }

    #[tokio::test]
    async fn test_missing_command_is_tool_output() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let result = TerminalTool.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert!(result.is_error);
    }
}
