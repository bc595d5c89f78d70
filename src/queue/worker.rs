//! Worker: claims jobs and dispatches them to handlers by event name.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use super::JobQueue;
use crate::domain::JobRecord;
use crate::error::{Result, VibeError};
use crate::id::now_ms;

/// Handles every job whose name equals [`JobHandler::event`]
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn event(&self) -> &'static str;

    /// Run one attempt. An error re-queues the job until attempts run out.
    async fn handle(&self, job: &JobRecord) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Jobs processed concurrently
    pub concurrency: usize,
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt
    pub retry_backoff: Duration,
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    fn backoff_ms(&self, attempts: u32) -> u64 {
        let base = self.retry_backoff.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempts.saturating_sub(1).min(16));
        base.saturating_mul(factor).min(600_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Retrying,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
}

impl WorkerStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => self.completed += 1,
            Outcome::Retrying => self.retried += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct Worker {
    queue: Arc<JobQueue>,
    handlers: Arc<HashMap<&'static str, Arc<dyn JobHandler>>>,
    semaphore: Arc<Semaphore>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(queue: Arc<JobQueue>, config: WorkerConfig) -> Self {
        Self {
            queue,
            handlers: Arc::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
        }
    }

    pub fn register(mut self, handler: Arc<dyn JobHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.insert(handler.event(), handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Claim ready jobs while permits are free
    async fn fill(&self, tasks: &mut JoinSet<Result<Outcome>>) -> Result<()> {
        while let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            let Some(job) = self.queue.claim_next().await? else {
                break;
            };
            tasks.spawn(dispatch(
                self.queue.clone(),
                self.handlers.clone(),
                self.config.clone(),
                job,
                permit,
            ));
        }
        Ok(())
    }

    fn joined(stats: &mut WorkerStats, joined: std::result::Result<Result<Outcome>, tokio::task::JoinError>) -> Result<()> {
        let outcome = joined.map_err(|e| VibeError::Queue(format!("job task panicked: {}", e)))??;
        stats.record(outcome);
        Ok(())
    }

    fn recover(&self) -> Result<()> {
        let recovered = self.queue.recover()?;
        if recovered > 0 {
            log::info!("Recovered {} interrupted job(s)", recovered);
        }
        Ok(())
    }

    /// Process until no job is pending or running
    pub async fn drain(&self) -> Result<WorkerStats> {
        self.recover()?;
        let mut stats = WorkerStats::default();
        let mut tasks = JoinSet::new();

        loop {
            self.fill(&mut tasks).await?;

            if let Some(joined) = tasks.join_next().await {
                Self::joined(&mut stats, joined)?;
                continue;
            }

            // Nothing in flight: either everything is done or a retry is backing off
            match self.queue.next_ready_at()? {
                Some(at) => {
                    let wait = (at - now_ms()).max(0) as u64;
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
                None => break,
            }
        }

        log::info!(
            "Worker drained: {} completed, {} retried, {} failed",
            stats.completed,
            stats.retried,
            stats.failed
        );
        Ok(stats)
    }

    /// Process until `shutdown` resolves, then wait for in-flight jobs
    pub async fn run<F>(&self, shutdown: F) -> Result<WorkerStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.recover()?;

        let mut stats = WorkerStats::default();
        let mut tasks = JoinSet::new();

        loop {
            self.fill(&mut tasks).await?;

            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Worker shutting down, waiting for {} job(s)", tasks.len());
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    Self::joined(&mut stats, joined)?;
                }
                _ = self.queue.notified() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        while let Some(joined) = tasks.join_next().await {
            Self::joined(&mut stats, joined)?;
        }
        Ok(stats)
    }
}

async fn dispatch(
    queue: Arc<JobQueue>,
    handlers: Arc<HashMap<&'static str, Arc<dyn JobHandler>>>,
    config: WorkerConfig,
    mut job: JobRecord,
    _permit: OwnedSemaphorePermit,
) -> Result<Outcome> {
    let Some(handler) = handlers.get(job.name.as_str()).cloned() else {
        log::error!("No handler registered for {} (job {})", job.name, job.id);
        let reason = format!("no handler for event {}", job.name);
        queue.fail(&mut job, &reason)?;
        return Ok(Outcome::Failed);
    };

    tracing::info!(job_id = %job.id, event = %job.name, attempt = job.attempts, "Job started");

    match handler.handle(&job).await {
        Ok(()) => {
            queue.complete(&mut job)?;
            tracing::info!(job_id = %job.id, attempt = job.attempts, "Job completed");
            Ok(Outcome::Completed)
        }
        Err(e) if job.attempts < config.max_attempts && !e.is_fatal() => {
            let delay_ms = config.backoff_ms(job.attempts);
            tracing::warn!(job_id = %job.id, attempt = job.attempts, delay_ms, error = %e, "Job failed, re-queued");
            queue.retry(&mut job, &e.to_string(), delay_ms)?;
            Ok(Outcome::Retrying)
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, attempt = job.attempts, error = %e, "Job failed");
            queue.fail(&mut job, &e.to_string())?;
            Ok(Outcome::Failed)
        }
    }
}
