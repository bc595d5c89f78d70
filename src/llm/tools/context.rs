//! Tool execution context - scoped to a single job's sandbox

use std::sync::Arc;

use crate::agent::StateHandle;
use crate::error::{Result, VibeError};
use crate::sandbox::{Sandbox, SandboxProvider};
use crate::steps::StepRunner;

/// Everything a tool call needs: the job's sandbox, state and step runner
#[derive(Clone)]
pub struct ToolContext {
    /// Sandbox created by the job's first step
    pub sandbox_id: String,

    provider: Arc<dyn SandboxProvider>,

    /// Shared agent state; file merges go through here
    pub state: StateHandle,

    /// Checkpoints each tool call
    pub steps: StepRunner,
}

impl ToolContext {
    pub fn new(
        sandbox_id: impl Into<String>,
        provider: Arc<dyn SandboxProvider>,
        state: StateHandle,
        steps: StepRunner,
    ) -> Self {
        Self {
            sandbox_id: sandbox_id.into(),
            provider,
            state,
            steps,
        }
    }

    /// Look the sandbox up by id.
    ///
    /// Transient failures are raised for the step runner to retry. Any other
    /// failure means the sandbox is gone and ends the job.
    pub async fn sandbox(&self) -> Result<Arc<dyn Sandbox>> {
        self.provider.connect(&self.sandbox_id).await.map_err(|e| {
            if e.is_transient() {
                VibeError::Sandbox(e)
            } else {
                VibeError::SandboxLost {
                    sandbox_id: self.sandbox_id.clone(),
                    message: e.to_string(),
                }
            }
        })
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("sandbox_id", &self.sandbox_id)
            .field("job_id", &self.steps.job_id())
            .finish_non_exhaustive()
    }
}
