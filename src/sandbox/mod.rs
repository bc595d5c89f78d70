//! Sandbox provisioning - isolated execution environments for the coding agent
//!
//! A [`SandboxProvider`] creates sandboxes from a template and reconnects to
//! them by id. A [`Sandbox`] exposes command execution (with incremental
//! output), file read/write, and the public host for a port. Operations may
//! fail transiently; retry is the caller's concern.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use local::LocalSandboxProvider;
pub use remote::{RemoteSandboxConfig, RemoteSandboxProvider};

/// Errors raised by sandbox providers
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Sandbox not found: {0}")]
    NotFound(String),

    /// Command ran but exited non-zero; output captured so far is kept
    #[error("exit status {exit_code}")]
    CommandExit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sandbox API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path escapes sandbox root: {0}")]
    PathEscape(String),

    #[error("Sandbox operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Output stream error: {0}")]
    Stream(String),
}

impl SandboxError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SandboxError::Http(_) | SandboxError::Timeout(_) | SandboxError::Stream(_) => true,
            SandboxError::Api { status, .. } => *status >= 500 || *status == 429,
            SandboxError::NotFound(_)
            | SandboxError::CommandExit { .. }
            | SandboxError::Io(_)
            | SandboxError::PathEscape(_) => false,
        }
    }
}

/// A piece of command output, delivered as it is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

/// Result of a command that exited zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A live handle to one sandbox
#[async_trait]
pub trait Sandbox: Send + Sync {
    fn id(&self) -> &str;

    /// Run a shell command, streaming output chunks to `output` when given.
    /// Non-zero exit is reported as [`SandboxError::CommandExit`].
    async fn exec(
        &self,
        command: &str,
        output: Option<&mpsc::UnboundedSender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError>;

    async fn read_file(&self, path: &str) -> Result<String, SandboxError>;

    /// Host (no scheme) under which `port` is publicly reachable
    fn public_host(&self, port: u16) -> String;
}

/// Creates sandboxes and looks them up by id
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provision a sandbox from `template`, returning its id
    async fn create(&self, template: &str) -> Result<String, SandboxError>;

    /// Reconnect to a sandbox previously returned by [`SandboxProvider::create`]
    async fn connect(&self, sandbox_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError>;
}
