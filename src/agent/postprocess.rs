//! Single-shot post-processing agents: fragment title and user reply.
//!
//! Each agent gets the task summary as its only input, runs once with no
//! tools, and its output is normalized to a plain string.

use std::sync::Arc;

use super::output::{OutputMessage, normalize_output, output_messages};
use super::prompts::{FRAGMENT_TITLE_PROMPT, RESPONSE_PROMPT};
use crate::error::{Result, VibeError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::steps::StepRunner;

pub const TITLE_STEP: &str = "generate-fragment-title";
pub const RESPONSE_STEP: &str = "generate-response";

/// Title and reply produced for a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessed {
    pub title: String,
    pub response: String,
}

pub struct PostProcessor {
    llm: Arc<dyn LlmClient>,
    model: Option<String>,
    max_tokens: u32,
}

impl PostProcessor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            model: None,
            max_tokens: 1024,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    async fn single_shot(&self, steps: &StepRunner, step_id: &str, system: &str, summary: &str) -> Result<String> {
        let mut request = CompletionRequest::new(system)
            .with_user_message(summary)
            .with_max_tokens(self.max_tokens);
        request.model = self.model.clone();

        let messages: Vec<OutputMessage> = steps
            .run(step_id, || {
                let llm = self.llm.clone();
                let request = request.clone();
                async move {
                    let response = llm.complete(request).await.map_err(VibeError::from)?;
                    Ok::<_, VibeError>(output_messages(&response))
                }
            })
            .await?;

        Ok(normalize_output(&messages))
    }

    /// Run both agents concurrently against `summary`
    pub async fn run(&self, steps: &StepRunner, summary: &str) -> Result<PostProcessed> {
        let (title, response) = tokio::try_join!(
            self.single_shot(steps, TITLE_STEP, FRAGMENT_TITLE_PROMPT, summary),
            self.single_shot(steps, RESPONSE_STEP, RESPONSE_PROMPT, summary),
        )?;
        Ok(PostProcessed { title, response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, MockLlmClient, ToolCall};
    use crate::steps::{RetryPolicy, StepLedger};
    use crate::storage::JsonlStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn steps(temp: &TempDir) -> StepRunner {
        let storage = Arc::new(JsonlStorage::new(temp.path()).unwrap());
        StepRunner::new("job-post", StepLedger::new(storage), RetryPolicy::default())
    }

    fn by_prompt() -> MockLlmClient {
        MockLlmClient::with_responder(|req| {
            if req.system == FRAGMENT_TITLE_PROMPT {
                Ok(CompletionResponse::text("Todo App"))
            } else {
                Ok(CompletionResponse::text("I built a todo app for you."))
            }
        })
    }

    #[tokio::test]
    async fn test_title_and_response_from_summary() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(by_prompt());

        let out = PostProcessor::new(llm.clone())
            .run(&steps(&temp), "Built a todo app")
            .await
            .unwrap();

        assert_eq!(out.title, "Todo App");
        assert_eq!(out.response, "I built a todo app for you.");
        for request in llm.requests() {
            assert!(request.tools.is_empty());
            assert_eq!(request.last_user_text().as_deref(), Some("Built a todo app"));
        }
    }

    #[tokio::test]
    async fn test_non_text_output_falls_back() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::always(CompletionResponse::tool_use(vec![ToolCall::new(
            "t",
            "terminal",
            json!({}),
        )])));

        let out = PostProcessor::new(llm).run(&steps(&temp), "summary").await.unwrap();
        assert_eq!(out.title, "Fragment");
        assert_eq!(out.response, "Fragment");
    }

    #[tokio::test]
    async fn test_replay_skips_model_calls() {
        let temp = TempDir::new().unwrap();
        let first = Arc::new(by_prompt());
        PostProcessor::new(first).run(&steps(&temp), "s").await.unwrap();

        let second = Arc::new(MockLlmClient::scripted(vec![]));
        let out = PostProcessor::new(second.clone()).run(&steps(&temp), "s").await.unwrap();

        assert_eq!(out.title, "Todo App");
        assert_eq!(second.call_count(), 0);
    }
}
