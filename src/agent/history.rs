//! Conversation state builder
//!
//! Turns a project's persisted messages into model history and seeds a
//! fresh [`AgentState`] for the run.

use serde::{Deserialize, Serialize};

use super::state::AgentState;
use crate::domain::{Message, MessageRole};
use crate::llm;

/// Role and content of one prior turn; everything else is dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: llm::Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn to_message(&self) -> llm::Message {
        match self.role {
            llm::Role::User => llm::Message::user(&self.content),
            llm::Role::Assistant => llm::Message::assistant(&self.content),
        }
    }
}

/// Seeded state plus chronological history for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub state: AgentState,
    pub history: Vec<HistoryEntry>,
}

impl Conversation {
    pub fn messages(&self) -> Vec<llm::Message> {
        self.history.iter().map(HistoryEntry::to_message).collect()
    }
}

/// Build the conversation from messages fetched newest first.
///
/// History is returned oldest first. When the newest message is the USER
/// message carrying `request` it is left out, since the request is sent as
/// the run's input.
pub fn build_conversation(newest_first: &[Message], request: &str) -> Conversation {
    let skip = match newest_first.first() {
        Some(m) if m.role == MessageRole::User && m.content == request => 1,
        _ => 0,
    };

    let history = newest_first
        .iter()
        .skip(skip)
        .rev()
        .map(|m| HistoryEntry {
            role: match m.role {
                MessageRole::User => llm::Role::User,
                MessageRole::Assistant => llm::Role::Assistant,
            },
            content: m.content.clone(),
        })
        .collect();

    Conversation {
        state: AgentState::new(),
        history,
    }
}
