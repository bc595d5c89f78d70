//! createOrUpdateFiles tool - write files into the sandbox

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolResult, transient_or};
use crate::domain::FileMap;
use crate::error::Result;

pub struct CreateOrUpdateFilesTool;

#[derive(Debug, Deserialize)]
struct FileEntry {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct Input {
    files: Vec<FileEntry>,
}

#[async_trait]
impl Tool for CreateOrUpdateFilesTool {
    fn name(&self) -> &'static str {
        "createOrUpdateFiles"
    }

    fn description(&self) -> &'static str {
        "Create or update files in the sandbox"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "content": { "type": "string" }
                        },
                        "required": ["path", "content"]
                    }
                }
            },
            "required": ["files"]
        })
    }

    /// Writes every file, then reports them for merging into agent state.
    /// Any failure leaves state untouched.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let input: Input = match serde_json::from_value(input) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Error: {}", e))),
        };

        let sandbox = ctx.sandbox().await?;

        let mut written = FileMap::new();
        for file in input.files {
            if let Err(e) = sandbox.write_file(&file.path, &file.content).await {
                return transient_or(e, |e| ToolResult::error(format!("Error: {}", e)));
            }
            written.insert(file.path, file.content);
        }

        let paths: Vec<&str> = written.keys().map(String::as_str).collect();
        let summary = format!("Updated files: {}", paths.join(", "));
        Ok(ToolResult::success(summary).with_files(written))
    }
}
