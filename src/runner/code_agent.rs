//! The `code-agent/run` function.
//!
//! Steps, in order: provision the sandbox, load project history, run the
//! agent network, then persist exactly one outcome. The error predicate is
//! checked before the sandbox URL and post-processing, so a failed run
//! costs no extra model calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::prompts::CODING_PROMPT;
use crate::agent::{Agent, AgentNetwork, NetworkConfig, PostProcessor, StateHandle, build_conversation};
use crate::domain::{CODE_AGENT_RUN, CodeAgentRun, JobRecord, Message, NewFragment, NewMessage};
use crate::error::{Result, VibeError};
use crate::id::outcome_message_id;
use crate::llm::LlmClient;
use crate::llm::tools::{ToolContext, ToolExecutor};
use crate::queue::JobHandler;
use crate::sandbox::SandboxProvider;
use crate::steps::{RetryPolicy, StepLedger, StepRunner};
use crate::storage::{JsonlStorage, MessageStore};

/// Content of the ERROR message written when a run produces nothing usable
pub const ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone)]
pub struct CodeAgentConfig {
    pub sandbox_template: String,
    /// Port the sandbox serves the app on
    pub preview_port: u16,
    pub network: NetworkConfig,
    pub steps: RetryPolicy,
}

impl Default for CodeAgentConfig {
    fn default() -> Self {
        Self {
            sandbox_template: "vibe-nextjs".to_string(),
            preview_port: 3000,
            network: NetworkConfig::default(),
            steps: RetryPolicy::default(),
        }
    }
}

pub struct CodeAgentFunction {
    storage: Arc<JsonlStorage>,
    llm: Arc<dyn LlmClient>,
    provider: Arc<dyn SandboxProvider>,
    config: CodeAgentConfig,
}

impl CodeAgentFunction {
    pub fn new(
        storage: Arc<JsonlStorage>,
        llm: Arc<dyn LlmClient>,
        provider: Arc<dyn SandboxProvider>,
        config: CodeAgentConfig,
    ) -> Self {
        Self {
            storage,
            llm,
            provider,
            config,
        }
    }

    fn network(&self) -> AgentNetwork {
        let coder = Agent::new("code-agent", CODING_PROMPT, ToolExecutor::standard());
        AgentNetwork::new(self.llm.clone(), vec![coder], self.config.network.clone())
    }

    /// The outcome id is derived from the job, so a save that landed before a
    /// crash is found again instead of written twice.
    async fn save(&self, steps: &StepRunner, new: NewMessage) -> Result<Message> {
        let id = outcome_message_id(steps.job_id());
        steps
            .run("save-result", || {
                let new = new.clone();
                let id = id.as_str();
                async move { MessageStore::new(self.storage.as_ref()).create_once(id, new) }
            })
            .await
    }

    /// Run one attempt of the job. Completed steps replay from the ledger.
    pub async fn execute(&self, job_id: &str, event: &CodeAgentRun) -> Result<Message> {
        let steps = StepRunner::new(job_id, StepLedger::new(self.storage.clone()), self.config.steps.clone());

        let template = self.config.sandbox_template.as_str();
        let sandbox_id: String = steps
            .run("get-sandbox-id", || async move { self.provider.create(template).await.map_err(VibeError::from) })
            .await?;

        let project_id = event.project_id.as_str();
        let previous: Vec<Message> = steps
            .run("get-previous-messages", || async move {
                MessageStore::new(self.storage.as_ref()).find_by_project_newest_first(project_id)
            })
            .await?;
        let conversation = build_conversation(&previous, &event.value);

        let state = StateHandle::new(conversation.state.clone());
        let ctx = ToolContext::new(&sandbox_id, self.provider.clone(), state, steps.clone());
        let run = self.network().run(&event.value, conversation.messages(), &ctx).await?;

        if run.state.is_error() {
            log::warn!(
                "[{}] run ended without a usable result (summary: {}, files: {})",
                job_id,
                !run.state.summary.is_empty(),
                run.state.files.len()
            );
            return self.save(&steps, NewMessage::error(&event.project_id, ERROR_MESSAGE)).await;
        }

        let port = self.config.preview_port;
        let sandbox_url: String = steps
            .run("get-sandbox-url", || {
                let sandbox_id = sandbox_id.clone();
                async move {
                    let sandbox = self.provider.connect(&sandbox_id).await?;
                    Ok::<_, VibeError>(format!("https://{}", sandbox.public_host(port)))
                }
            })
            .await?;

        let post = PostProcessor::new(self.llm.clone())
            .with_model(self.config.network.model.clone())
            .run(&steps, &run.state.summary)
            .await?;

        let fragment = NewFragment {
            sandbox_url,
            title: post.title,
            files: run.state.files,
        };
        self.save(&steps, NewMessage::result(&event.project_id, post.response, fragment))
            .await
    }
}

#[async_trait]
impl JobHandler for CodeAgentFunction {
    fn event(&self) -> &'static str {
        CODE_AGENT_RUN
    }

    async fn handle(&self, job: &JobRecord) -> Result<()> {
        let event: CodeAgentRun = serde_json::from_value(job.data.clone())
            .map_err(|e| VibeError::BadRequest(format!("invalid {} payload: {}", CODE_AGENT_RUN, e)))?;
        let message = self.execute(&job.id, &event).await?;
        tracing::info!(
            job_id = %job.id,
            project_id = %event.project_id,
            message_id = %message.id,
            outcome = ?message.message_type,
            "Code agent finished"
        );
        Ok(())
    }
}
