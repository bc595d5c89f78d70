//! Chat messages and the fragments attached to assistant results.
//!
//! Messages are append-only. Conversation order is creation order; every
//! job adds at most one ASSISTANT message.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{generate_fragment_id, generate_message_id};
use crate::storage::HasId;

/// Path -> file content, ordered by path
pub type FileMap = BTreeMap<String, String>;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Whether a message carries a result or the fixed failure text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Result,
    Error,
}

/// Output of a successful job: preview link, title and generated files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub message_id: String,
    pub sandbox_url: String,
    pub title: String,
    pub files: FileMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fragment contents supplied when creating a RESULT message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFragment {
    pub sandbox_url: String,
    pub title: String,
    pub files: FileMap,
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub role: MessageRole,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub fragment: Option<Fragment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub project_id: String,
    pub content: String,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub fragment: Option<NewFragment>,
}

impl NewMessage {
    /// The synchronous USER message recorded at request time
    pub fn user(project_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            content: content.into(),
            role: MessageRole::User,
            message_type: MessageType::Result,
            fragment: None,
        }
    }

    /// An ASSISTANT result with its fragment
    pub fn result(project_id: impl Into<String>, content: impl Into<String>, fragment: NewFragment) -> Self {
        Self {
            project_id: project_id.into(),
            content: content.into(),
            role: MessageRole::Assistant,
            message_type: MessageType::Result,
            fragment: Some(fragment),
        }
    }

    /// An ASSISTANT error; never carries a fragment
    pub fn error(project_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            content: content.into(),
            role: MessageRole::Assistant,
            message_type: MessageType::Error,
            fragment: None,
        }
    }
}

impl Message {
    /// Materialize a new message (and its fragment) with fresh ids and timestamps
    pub fn from_new(new: NewMessage) -> Self {
        Self::from_new_with_id(new, generate_message_id())
    }

    /// Like [`Message::from_new`], keeping a caller-chosen message id
    pub fn from_new_with_id(new: NewMessage, id: String) -> Self {
        let now = Utc::now();
        let fragment = new.fragment.map(|f| Fragment {
            id: generate_fragment_id(),
            message_id: id.clone(),
            sandbox_url: f.sandbox_url,
            title: f.title,
            files: f.files,
            created_at: now,
            updated_at: now,
        });

        Self {
            id,
            project_id: new.project_id,
            content: new.content,
            role: new.role,
            message_type: new.message_type,
            fragment,
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasId for Message {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection() -> &'static str {
        "messages"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_and_type_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"USER\"");
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"ASSISTANT\"");
        assert_eq!(serde_json::to_string(&MessageType::Result).unwrap(), "\"RESULT\"");
        assert_eq!(serde_json::to_string(&MessageType::Error).unwrap(), "\"ERROR\"");
    }

    #[test]
    fn test_user_message_has_no_fragment() {
        let msg = Message::from_new(NewMessage::user("prj-1", "build a todo app"));
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.message_type, MessageType::Result);
        assert!(msg.fragment.is_none());
        assert_eq!(msg.created_at, msg.updated_at);
    }

    #[test]
    fn test_result_fragment_is_owned_by_message() {
        let mut files = FileMap::new();
        files.insert("app/page.tsx".to_string(), "export default 1".to_string());
        let msg = Message::from_new(NewMessage::result(
            "prj-1",
            "Built it",
            NewFragment {
                sandbox_url: "https://3000-sbx.example.dev".to_string(),
                title: "Todo App".to_string(),
                files,
            },
        ));

        let fragment = msg.fragment.as_ref().unwrap();
        assert_eq!(fragment.message_id, msg.id);
        assert_eq!(fragment.title, "Todo App");
        assert_eq!(fragment.files.len(), 1);
    }

    #[test]
    fn test_error_message_serializes_type_field() {
        let msg = Message::from_new(NewMessage::error("prj-1", "Something went wrong. Please try again."));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["role"], "ASSISTANT");
        assert!(json["fragment"].is_null());
    }
}
