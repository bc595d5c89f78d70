//! readFiles tool - read files back from the sandbox

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Tool, ToolContext, ToolResult, transient_or};
use crate::error::Result;

pub struct ReadFilesTool;

#[derive(Debug, Deserialize)]
struct Input {
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FileContent {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &'static str {
        "readFiles"
    }

    fn description(&self) -> &'static str {
        "Read files from the sandbox"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["files"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let input: Input = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Error: {}", e))),
        };

        let sandbox = ctx.sandbox().await?;

        let mut contents = Vec::with_capacity(input.files.len());
        for path in input.files {
            match sandbox.read_file(&path).await {
                Ok(content) => contents.push(FileContent { path, content }),
                Err(e) => return transient_or(e, |e| ToolResult::error(format!("Error: {}", e))),
            }
        }

        Ok(ToolResult::success(serde_json::to_string(&contents)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::test_support::context;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_files_as_json_array() {
        let temp = TempDir::new().unwrap();
        let (ctx, sandbox) = context(&temp).await;
        sandbox.write_file("a.txt", "alpha").await.unwrap();
        sandbox.write_file("dir/b.txt", "beta").await.unwrap();

        let result = ReadFilesTool
            .execute(serde_json::json!({"files": ["a.txt", "dir/b.txt"]}), &ctx)
            .await
            .unwrap();

        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {"path": "a.txt", "content": "alpha"},
                {"path": "dir/b.txt", "content": "beta"}
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_error_string() {
        let temp = TempDir::new().unwrap();
        let (ctx, _sandbox) = context(&temp).await;

        let result = ReadFilesTool
            .execute(serde_json::json!({"files": ["nope.txt"]}), &ctx)
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.content.starts_with("Error: "));
    }
}
