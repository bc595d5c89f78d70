//! Tool executor - registry plus checkpointed batch execution

use std::collections::HashMap;

use futures::future::join_all;

use super::{CreateOrUpdateFilesTool, ReadFilesTool, TerminalTool, Tool, ToolContext, ToolResult};
use crate::error::{Result, VibeError};
use crate::llm::{ToolCall, ToolDefinition};

/// Manages the tools available to the coding agent
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the sandbox tools
    pub fn standard() -> Self {
        let mut executor = Self::new();
        executor.add_tool(Box::new(TerminalTool));
        executor.add_tool(Box::new(CreateOrUpdateFilesTool));
        executor.add_tool(Box::new(ReadFilesTool));
        executor
    }

    /// Create an empty executor (for custom tool sets)
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool definitions for the LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.input_schema()))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Step id of the `idx`-th tool call in `turn`
    pub fn step_id(turn: u32, idx: usize, name: &str) -> String {
        format!("turn-{}/tool-{}-{}", turn, idx, name)
    }

    /// Execute one tool call as a step, then apply its file writes to state
    pub async fn execute(&self, turn: u32, idx: usize, call: &ToolCall, ctx: &ToolContext) -> Result<crate::llm::ToolResult> {
        let Some(tool) = self.tools.get(&call.name) else {
            log::warn!("Model called unknown tool {}", call.name);
            return Ok(crate::llm::ToolResult::error(
                &call.id,
                format!("Error: unknown tool '{}'", call.name),
            ));
        };

        let step_id = Self::step_id(turn, idx, &call.name);
        let result = match ctx.steps.run(&step_id, || tool.execute(call.input.clone(), ctx)).await {
            Ok(result) => result,
            Err(e @ VibeError::Step { .. }) => ToolResult::error(format!("Error: {}", e)),
            Err(e) => return Err(e),
        };

        if let Some(files) = result.files {
            ctx.state.merge_files(files).await;
        }

        Ok(crate::llm::ToolResult {
            tool_use_id: call.id.clone(),
            content: result.content,
            is_error: result.is_error,
        })
    }

    /// Execute every call of one model turn concurrently, results in call order
    pub async fn execute_batch(
        &self,
        turn: u32,
        calls: &[ToolCall],
        ctx: &ToolContext,
    ) -> Result<Vec<crate::llm::ToolResult>> {
        let futures = calls
            .iter()
            .enumerate()
            .map(|(idx, call)| self.execute(turn, idx, call, ctx));
        join_all(futures).await.into_iter().collect()
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::test_support::context;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_standard_executor_has_all_tools() {
        let executor = ToolExecutor::standard();

        assert!(executor.has_tool("terminal"));
        assert!(executor.has_tool("createOrUpdateFiles"));
        assert!(executor.has_tool("readFiles"));

        let names: Vec<String> = executor.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["createOrUpdateFiles", "readFiles", "terminal"]);
    }

    #[test]
    fn test_step_id_format() {
        assert_eq!(ToolExecutor::step_id(3, 1, "terminal"), "turn-3/tool-1-terminal");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let call = ToolCall::new("call_1", "nonexistent_tool", json!({}));
        let result = ToolExecutor::standard().execute(1, 0, &call, &ctx).await.unwrap();

        assert!(result.is_error);
        assert_eq!(result.tool_use_id, "call_1");
        assert!(result.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_deleted_sandbox_fails_the_call() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;
        std::fs::remove_dir_all(temp.path().join("sandboxes").join(&ctx.sandbox_id)).unwrap();

        let call = ToolCall::new("call_1", "terminal", json!({"command": "true"}));
        let result = ToolExecutor::standard().execute(1, 0, &call, &ctx).await;

        assert!(matches!(result, Err(VibeError::SandboxLost { .. })));
    }

    #[tokio::test]
    async fn test_batch_merges_files_from_every_call() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let calls = vec![
            ToolCall::new(
                "call_1",
                "createOrUpdateFiles",
                json!({"files": [{"path": "a.txt", "content": "x"}]}),
            ),
            ToolCall::new(
                "call_2",
                "createOrUpdateFiles",
                json!({"files": [{"path": "b.txt", "content": "y"}]}),
            ),
            ToolCall::new("call_3", "terminal", json!({"command": "echo hi"})),
        ];

        let results = ToolExecutor::standard().execute_batch(1, &calls, &ctx).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.tool_use_id.as_str()).collect();
        assert_eq!(ids, vec!["call_1", "call_2", "call_3"]);
        let files = ctx.state.snapshot().await.files;
        assert_eq!(files.get("a.txt").map(String::as_str), Some("x"));
        assert_eq!(files.get("b.txt").map(String::as_str), Some("y"));
    }

    #[tokio::test]
    async fn test_replayed_call_reapplies_files_without_rewriting() {
        let temp = TempDir::new().unwrap();
        let (ctx, sandbox) = context(&temp).await;
        let executor = ToolExecutor::standard();
        let call = ToolCall::new(
            "call_1",
            "createOrUpdateFiles",
            json!({"files": [{"path": "a.txt", "content": "first"}]}),
        );

        executor.execute(1, 0, &call, &ctx).await.unwrap();
        sandbox.write_file("a.txt", "changed outside").await.unwrap();

        // Same turn and index: the ledger answers, the sandbox is not touched
        let replay_ctx = ToolContext::new(
            ctx.sandbox_id.clone(),
            std::sync::Arc::new(crate::sandbox::LocalSandboxProvider::new(
                temp.path().join("sandboxes"),
                std::time::Duration::from_secs(10),
            )),
            crate::agent::StateHandle::default(),
            ctx.steps.clone(),
        );
        executor.execute(1, 0, &call, &replay_ctx).await.unwrap();

        assert_eq!(sandbox.read_file("a.txt").await.unwrap(), "changed outside");
        assert_eq!(
            replay_ctx.state.snapshot().await.files.get("a.txt").map(String::as_str),
            Some("first")
        );
    }
}
