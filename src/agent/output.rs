//! Agent output messages and their normalization to a single string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::CompletionResponse;

/// Fallback when an agent's first output message is not text
pub const FALLBACK_TEXT: &str = "Fragment";

/// One part of a multi-part text message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPart {
    Plain(String),
    Block { text: String },
}

impl TextPart {
    fn as_str(&self) -> &str {
        match self {
            TextPart::Plain(text) => text,
            TextPart::Block { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextContent {
    Single(String),
    Parts(Vec<TextPart>),
}

/// A message produced by an agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputMessage {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        content: TextContent,
    },
    ToolCall {
        #[serde(default)]
        tools: Vec<Value>,
    },
    /// Any other message kind (images, tool results, ...)
    #[serde(other)]
    Other,
}

/// Messages of a single-shot agent response: its text, then any tool calls
pub fn output_messages(response: &CompletionResponse) -> Vec<OutputMessage> {
    let mut messages = Vec::new();
    if !response.content.is_empty() {
        messages.push(OutputMessage::Text {
            role: Some("assistant".to_string()),
            content: TextContent::Single(response.content.clone()),
        });
    }
    if !response.tool_calls.is_empty() {
        messages.push(OutputMessage::ToolCall {
            tools: response
                .tool_calls
                .iter()
                .map(|c| serde_json::json!({"id": c.id, "name": c.name, "input": c.input}))
                .collect(),
        });
    }
    messages
}

/// Normalize agent output to one string.
///
/// Only the first message counts. Non-text (or no message at all) yields
/// [`FALLBACK_TEXT`]; multi-part text is concatenated without separators.
pub fn normalize_output(messages: &[OutputMessage]) -> String {
    match messages.first() {
        Some(OutputMessage::Text { content, .. }) => match content {
            TextContent::Single(text) => text.clone(),
            TextContent::Parts(parts) => parts.iter().map(TextPart::as_str).collect(),
        },
        _ => FALLBACK_TEXT.to_string(),
    }
}
