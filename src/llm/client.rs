//! Core LLM client trait, errors and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call carries the whole conversation
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model used when the request does not name one
    fn model(&self) -> &str;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::JsonError(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync>;

/// Test double answering from a script or a closure, recording every request
pub struct MockLlmClient {
    responder: Responder,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Answer with `responses` in order; further calls fail as invalid responses
    pub fn scripted(responses: Vec<CompletionResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::with_responder(move |_| {
            queue
                .lock()
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string()))
        })
    }

    /// Answer every call with the same response
    pub fn always(response: CompletionResponse) -> Self {
        Self::with_responder(move |_| Ok(response.clone()))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl std::fmt::Debug for MockLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLlmClient")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = (self.responder)(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        response
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );

        assert!(
            LlmError::ApiError {
                status: 500,
                message: "Internal error".to_string()
            }
            .is_retryable()
        );

        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );

        assert!(!LlmError::InvalidResponse("bad".to_string()).is_retryable());
        assert!(
            !LlmError::MissingApiKey {
                env_var: "ANTHROPIC_API_KEY".to_string()
            }
            .is_retryable()
        );
    }

    #[tokio::test]
    async fn test_scripted_mock_answers_in_order() {
        let mock = MockLlmClient::scripted(vec![CompletionResponse::text("one"), CompletionResponse::text("two")]);

        let first = mock.complete(CompletionRequest::new("sys")).await.unwrap();
        let second = mock.complete(CompletionRequest::new("sys")).await.unwrap();
        let third = mock.complete(CompletionRequest::new("sys")).await;

        assert_eq!(first.content, "one");
        assert_eq!(second.content, "two");
        assert!(matches!(third, Err(LlmError::InvalidResponse(_))));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_responder_sees_request() {
        let mock = MockLlmClient::with_responder(|req| Ok(CompletionResponse::text(req.system.to_uppercase())));

        let response = mock
            .complete(CompletionRequest::new("title").with_user_message("hi"))
            .await
            .unwrap();

        assert_eq!(response.content, "TITLE");
        assert_eq!(mock.requests()[0].last_user_text().as_deref(), Some("hi"));
    }
}
