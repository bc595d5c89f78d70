//! Agent network: router plus the iterative tool-calling loop
//!
//! Two states: running (no summary) and done (summary set). Before each
//! iteration the router picks the next agent or ends the run; after each
//! model response the lifecycle hook scans the text for the task summary.
//! The iteration ceiling bounds runaway loops and ends the run in the same
//! state as "no summary produced".

use std::sync::Arc;

use super::prompts::CONTINUE_NUDGE;
use super::sentinel::extract_task_summary;
use super::state::AgentState;
use crate::error::{Result, VibeError};
use crate::llm::tools::{ToolContext, ToolExecutor};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message};

/// One agent role: its prompt and the tools it may call
pub struct Agent {
    pub name: String,
    pub system: String,
    pub tools: ToolExecutor,
}

impl Agent {
    pub fn new(name: impl Into<String>, system: impl Into<String>, tools: ToolExecutor) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            tools,
        }
    }
}

/// Picks the agent for the next iteration, or `None` to stop
pub trait Router: Send + Sync {
    fn route<'a>(&self, agents: &'a [Agent], state: &AgentState, iteration: u32) -> Option<&'a Agent>;
}

/// Stop once a summary exists, otherwise keep dispatching to the first agent
#[derive(Debug, Default)]
pub struct SummaryRouter;

impl Router for SummaryRouter {
    fn route<'a>(&self, agents: &'a [Agent], state: &AgentState, _iteration: u32) -> Option<&'a Agent> {
        if state.is_done() { None } else { agents.first() }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub max_iterations: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub model: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_tokens: 8192,
            temperature: 0.1,
            model: None,
        }
    }
}

/// Final state of a network run
#[derive(Debug, Clone)]
pub struct NetworkRun {
    pub state: AgentState,
    /// Model turns taken
    pub iterations: u32,
}

pub struct AgentNetwork {
    llm: Arc<dyn LlmClient>,
    agents: Vec<Agent>,
    router: Box<dyn Router>,
    config: NetworkConfig,
}

impl AgentNetwork {
    pub fn new(llm: Arc<dyn LlmClient>, agents: Vec<Agent>, config: NetworkConfig) -> Self {
        Self {
            llm,
            agents,
            router: Box::new(SummaryRouter),
            config,
        }
    }

    pub fn with_router(mut self, router: Box<dyn Router>) -> Self {
        self.router = router;
        self
    }

    fn request_for(&self, agent: &Agent, messages: &[Message]) -> CompletionRequest {
        let mut request = CompletionRequest::new(&agent.system)
            .with_messages(messages.iter().cloned())
            .with_tools(agent.tools.definitions())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        request.model = self.config.model.clone();
        request
    }

    /// Lifecycle hook run after every response
    async fn on_response(&self, response: &CompletionResponse, ctx: &ToolContext) {
        if let Some(summary) = extract_task_summary(&response.content) {
            log::info!("[{}] task summary received", ctx.steps.job_id());
            ctx.state.set_summary(summary).await;
        }
    }

    /// Run until the router stops or the iteration ceiling is reached.
    ///
    /// `history` is prior conversation, oldest first; `input` is the request.
    pub async fn run(&self, input: &str, history: Vec<Message>, ctx: &ToolContext) -> Result<NetworkRun> {
        let mut messages = history;
        messages.push(Message::user(input));

        let mut iteration = 0;
        while iteration < self.config.max_iterations {
            let state = ctx.state.snapshot().await;
            let Some(agent) = self.router.route(&self.agents, &state, iteration) else {
                break;
            };
            iteration += 1;

            let request = self.request_for(agent, &messages);
            let step_id = format!("turn-{}/inference", iteration);
            let response: CompletionResponse = ctx
                .steps
                .run(&step_id, || {
                    let llm = self.llm.clone();
                    let request = request.clone();
                    async move { llm.complete(request).await.map_err(VibeError::from) }
                })
                .await?;

            tracing::debug!(
                job_id = %ctx.steps.job_id(),
                agent = %agent.name,
                iteration,
                tool_calls = response.tool_calls.len(),
                "Agent responded"
            );

            if !response.content.is_empty() || response.has_tool_calls() {
                messages.push(Message::from_response(&response));
            }
            if response.has_tool_calls() {
                let results = agent.tools.execute_batch(iteration, &response.tool_calls, ctx).await?;
                messages.push(Message::tool_results(results));
            }

            self.on_response(&response, ctx).await;

            if !response.has_tool_calls() && !ctx.state.is_done().await {
                messages.push(Message::user(CONTINUE_NUDGE));
            }
        }

        let state = ctx.state.snapshot().await;
        if !state.is_done() {
            log::warn!(
                "[{}] agent stopped after {} iteration(s) without a summary",
                ctx.steps.job_id(),
                iteration
            );
        }
        Ok(NetworkRun {
            state,
            iterations: iteration,
        })
    }
}
