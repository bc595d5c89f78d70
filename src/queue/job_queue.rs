//! Persisted FIFO of [`JobRecord`]s with in-process wakeups.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::domain::{JobEvent, JobRecord, JobStatus};
use crate::error::{Result, VibeError};
use crate::id::now_ms;
use crate::storage::{JobStore, JsonlStorage};

pub struct JobQueue {
    storage: Arc<JsonlStorage>,
    /// Serializes claims so two workers never take the same job
    claim: Mutex<()>,
    notify: Notify,
}

impl JobQueue {
    pub fn new(storage: Arc<JsonlStorage>) -> Self {
        Self {
            storage,
            claim: Mutex::new(()),
            notify: Notify::new(),
        }
    }

    fn jobs(&self) -> JobStore<'_, JsonlStorage> {
        JobStore::new(&self.storage)
    }

    /// Persist a pending job for `event` and wake a waiting worker
    pub fn enqueue(&self, event: JobEvent) -> Result<JobRecord> {
        let record = JobRecord::new(event);
        self.jobs().create(&record)?;
        tracing::info!(job_id = %record.id, event = %record.name, "Job enqueued");
        self.notify.notify_one();
        Ok(record)
    }

    pub fn get(&self, job_id: &str) -> Result<JobRecord> {
        self.jobs()
            .get(job_id)?
            .ok_or_else(|| VibeError::NotFound(format!("Job {} not found", job_id)))
    }

    /// Move the oldest ready job to running and return it
    pub async fn claim_next(&self) -> Result<Option<JobRecord>> {
        let _guard = self.claim.lock().await;
        let Some(mut job) = self.jobs().find_ready(now_ms())?.into_iter().next() else {
            return Ok(None);
        };
        job.mark_running();
        self.jobs().update(&job)?;
        Ok(Some(job))
    }

    pub fn complete(&self, job: &mut JobRecord) -> Result<()> {
        job.mark_completed();
        self.jobs().update(job)
    }

    pub fn retry(&self, job: &mut JobRecord, error: &str, delay_ms: u64) -> Result<()> {
        job.mark_retry(error, delay_ms);
        self.jobs().update(job)?;
        self.notify.notify_one();
        Ok(())
    }

    pub fn fail(&self, job: &mut JobRecord, error: &str) -> Result<()> {
        job.mark_failed(error);
        self.jobs().update(job)
    }

    /// Reset jobs left running by a process that died mid-attempt
    pub fn recover(&self) -> Result<usize> {
        let orphaned = self.jobs().find_by_status(JobStatus::Running)?;
        for mut job in orphaned.iter().cloned() {
            job.mark_recovered();
            self.jobs().update(&job)?;
            log::warn!("Recovered job {} (attempt {})", job.id, job.attempts);
        }
        Ok(orphaned.len())
    }

    /// Every job, most recently enqueued first
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let mut jobs = self.jobs().list_all()?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// True while any job is pending or running
    pub fn has_unfinished(&self) -> Result<bool> {
        Ok(self.jobs().list_all()?.iter().any(|j| !j.status.is_terminal()))
    }

    /// Earliest time a backed-off pending job becomes ready
    pub fn next_ready_at(&self) -> Result<Option<i64>> {
        Ok(self
            .jobs()
            .find_by_status(JobStatus::Pending)?
            .iter()
            .map(|j| j.not_before.unwrap_or(0))
            .min())
    }

    /// Resolves when a job is enqueued or re-queued
    pub async fn notified(&self) {
        self.notify.notified().await
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").field("storage", &self.storage).finish_non_exhaustive()
    }
}
