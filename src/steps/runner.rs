//! Step runner: replay from the ledger, otherwise run with timeout and retry.

use std::future::Future;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::StepLedger;
use crate::error::{Result, VibeError};

/// Retry policy for a single step
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Budget for one attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` (1-based) failed.
    ///
    /// Doubles from `initial_backoff`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Runs the steps of one job against its ledger
#[derive(Debug, Clone)]
pub struct StepRunner {
    job_id: String,
    ledger: StepLedger,
    policy: RetryPolicy,
}

impl StepRunner {
    pub fn new(job_id: impl Into<String>, ledger: StepLedger, policy: RetryPolicy) -> Self {
        Self {
            job_id: job_id.into(),
            ledger,
            policy,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Run `step_id` at most once observably.
    ///
    /// A recorded output is deserialized and returned without calling `f`.
    /// Otherwise `f` is attempted until it succeeds, fails with a
    /// non-retryable error, or `max_attempts` is reached. Fatal errors are
    /// returned as-is; every other failure becomes [`VibeError::Step`].
    pub async fn run<T, F, Fut>(&self, step_id: &str, mut f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(record) = self.ledger.get(&self.job_id, step_id)? {
            tracing::debug!(job_id = %self.job_id, step_id, "Step replayed from ledger");
            return Ok(serde_json::from_value(record.output)?);
        }

        let timeout_ms = self.policy.timeout.as_millis() as u64;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.policy.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(VibeError::Timeout(timeout_ms)),
            };

            match outcome {
                Ok(value) => {
                    self.ledger
                        .record(&self.job_id, step_id, serde_json::to_value(&value)?, attempt)?;
                    tracing::debug!(job_id = %self.job_id, step_id, attempt, "Step completed");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        job_id = %self.job_id,
                        step_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(job_id = %self.job_id, step_id, attempt, error = %e, "Step aborted the job");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(job_id = %self.job_id, step_id, attempt, error = %e, "Step failed");
                    return Err(VibeError::Step {
                        step_id: step_id.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
