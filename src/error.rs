//! Error types for Vibe
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::llm::LlmError;
use crate::sandbox::SandboxError;

/// All error types that can occur in Vibe
#[derive(Debug, Error)]
pub enum VibeError {
    /// Record not found (project, message, job)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied something we refuse to process
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller is out of credits
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Sandbox provider error
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// The job's sandbox can no longer be looked up
    #[error("Sandbox {sandbox_id} is gone: {message}")]
    SandboxLost { sandbox_id: String, message: String },

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// A durable step exhausted its attempts
    #[error("Step '{step_id}' failed after {attempts} attempt(s): {message}")]
    Step {
        step_id: String,
        attempts: u32,
        message: String,
    },

    /// An operation exceeded its time budget
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Job queue error
    #[error("Queue error: {0}")]
    Queue(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VibeError {
    /// Stable code string for the caller-facing refusal classes
    pub fn code(&self) -> &'static str {
        match self {
            VibeError::NotFound(_) => "NOT_FOUND",
            VibeError::BadRequest(_) => "BAD_REQUEST",
            VibeError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether a step hitting this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            VibeError::Llm(e) => e.is_retryable(),
            VibeError::Sandbox(e) => e.is_transient(),
            VibeError::Timeout(_) => true,
            VibeError::Io(_) => true,
            _ => false,
        }
    }

    /// Whether the whole job must stop rather than retry or report to the model
    pub fn is_fatal(&self) -> bool {
        matches!(self, VibeError::SandboxLost { .. })
    }
}

/// Result type alias for Vibe operations
pub type Result<T> = std::result::Result<T, VibeError>;
