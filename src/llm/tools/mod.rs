//! Tool system for the coding agent
//!
//! Three tools bridge the model's tool calls to the job's sandbox. Each call
//! runs as its own checkpointed step. Failures come back as tool output
//! text so the model can react to them. Transient sandbox errors are raised
//! so the step runner retries them, and a sandbox that can no longer be
//! looked up ends the job.

mod context;
mod executor;
mod read_files;
mod terminal;
mod write_files;

pub use context::ToolContext;
pub use executor::ToolExecutor;
pub use read_files::ReadFilesTool;
pub use terminal::TerminalTool;
pub use write_files::CreateOrUpdateFilesTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::FileMap;
use crate::error::Result;
use crate::sandbox::SandboxError;

/// A tool that can be called by the LLM
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches LLM tool_use name)
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult>;
}

/// Result from tool execution, checkpointed as the step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    /// Files written by the call, merged into agent state after the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<FileMap>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            files: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            files: None,
        }
    }

    pub fn with_files(mut self, files: FileMap) -> Self {
        self.files = Some(files);
        self
    }
}

/// Raise transient sandbox errors for retry; turn the rest into tool output
pub(crate) fn transient_or<F>(err: SandboxError, to_output: F) -> Result<ToolResult>
where
    F: FnOnce(SandboxError) -> ToolResult,
{
    if err.is_transient() {
        Err(err.into())
    } else {
        Ok(to_output(err))
    }
}
