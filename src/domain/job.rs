//! Background job records
//!
//! A JobRecord is the durable form of one enqueued event. Workers claim
//! pending records, run the handler registered for the event name and move
//! the record to a terminal status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{generate_job_id, now_ms};
use crate::storage::HasId;

/// Event name that triggers the coding agent
pub const CODE_AGENT_RUN: &str = "code-agent/run";

/// An event as submitted to the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub name: String,
    pub data: Value,
}

impl JobEvent {
    pub fn new(name: impl Into<String>, data: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            name: name.into(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Payload of a `code-agent/run` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAgentRun {
    /// The user's request
    pub value: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
}

/// Lifecycle of a queued job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker (possibly until `not_before`)
    Pending,
    /// Claimed by a worker
    Running,
    /// Handler returned Ok
    Completed,
    /// Handler failed on its last allowed attempt
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Durable record of an enqueued event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier for this job
    pub id: String,

    /// Event name, used to pick the handler
    pub name: String,

    /// Event payload, immutable once enqueued
    pub data: Value,

    pub status: JobStatus,

    /// Number of times a worker has started this job
    pub attempts: u32,

    /// Error text of the most recent failed attempt
    pub last_error: Option<String>,

    /// Earliest time (Unix ms) a worker may claim the job
    pub not_before: Option<i64>,

    /// When this job was enqueued (Unix ms)
    pub created_at: i64,

    /// Last status change (Unix ms)
    pub updated_at: i64,
}

impl JobRecord {
    pub fn new(event: JobEvent) -> Self {
        let now = now_ms();
        Self {
            id: generate_job_id(),
            name: event.name,
            data: event.data,
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            not_before: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Claim the job for execution
    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.attempts += 1;
        self.not_before = None;
        self.updated_at = now_ms();
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.updated_at = now_ms();
    }

    /// Put the job back in line after a failed attempt
    pub fn mark_retry(&mut self, error: &str, delay_ms: u64) {
        let now = now_ms();
        self.status = JobStatus::Pending;
        self.last_error = Some(error.to_string());
        self.not_before = Some(now + delay_ms as i64);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error: &str) {
        self.status = JobStatus::Failed;
        self.last_error = Some(error.to_string());
        self.updated_at = now_ms();
    }

    /// Reset a job orphaned by a crashed worker; the attempt still counts
    pub fn mark_recovered(&mut self) {
        self.status = JobStatus::Pending;
        self.updated_at = now_ms();
    }
}

impl HasId for JobRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection() -> &'static str {
        "jobs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> JobEvent {
        JobEvent::new(
            CODE_AGENT_RUN,
            CodeAgentRun {
                value: "make a calculator".to_string(),
                project_id: "prj-1".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_code_agent_run_wire_format() {
        let ev = event();
        assert_eq!(ev.name, "code-agent/run");
        assert_eq!(ev.data, json!({"value": "make a calculator", "projectId": "prj-1"}));

        let back: CodeAgentRun = serde_json::from_value(ev.data).unwrap();
        assert_eq!(back.project_id, "prj-1");
    }

    #[test]
    fn test_job_record_new_is_pending() {
        let job = JobRecord::new(event());
        assert!(job.id.starts_with("job-"));
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.not_before.is_none());
    }

    #[test]
    fn test_running_counts_attempts() {
        let mut job = JobRecord::new(event());
        job.mark_running();
        job.mark_retry("boom", 1000);
        job.mark_running();

        assert_eq!(job.attempts, 2);
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.not_before.is_none());
        assert_eq!(job.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_retry_sets_not_before() {
        let mut job = JobRecord::new(event());
        job.mark_running();
        job.mark_retry("transient", 5000);

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.not_before.unwrap() >= job.updated_at + 5000);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), "\"running\"");
    }
}
