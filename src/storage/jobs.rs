//! Job-specific storage helpers.

use super::traits::{Filter, Storage};
use crate::domain::{JobRecord, JobStatus};
use crate::error::Result;

/// Helper for job queries.
pub struct JobStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> JobStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        self.storage.get(id)
    }

    pub fn create(&self, record: &JobRecord) -> Result<()> {
        self.storage.create(record)
    }

    pub fn update(&self, record: &JobRecord) -> Result<()> {
        self.storage.update(record)
    }

    pub fn find_by_status(&self, status: JobStatus) -> Result<Vec<JobRecord>> {
        self.storage.query(&[Filter::eq("status", status)])
    }

    /// Pending jobs whose backoff has elapsed at `now_ms`, oldest first.
    pub fn find_ready(&self, now_ms: i64) -> Result<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self.storage.query(&[
            Filter::eq("status", JobStatus::Pending),
            Filter::at_most("not_before", now_ms),
        ])?;
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    pub fn list_all(&self) -> Result<Vec<JobRecord>> {
        self.storage.list()
    }
}
