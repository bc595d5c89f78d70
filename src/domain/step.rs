//! Checkpointed step outputs
//!
//! One StepRecord per completed step of a job. The record id is derived from
//! `(job_id, step_id)` so a replayed step finds its checkpoint by lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::id::now_ms;
use crate::storage::HasId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// `hex(sha256("<job_id>:<step_id>"))`
    pub id: String,

    pub job_id: String,

    /// Deterministic step name within the job, e.g. `turn-3/inference`
    pub step_id: String,

    /// JSON output returned to the caller on replay
    pub output: Value,

    /// Attempts it took to produce the output
    pub attempts: u32,

    /// Unix ms
    pub completed_at: i64,
}

impl StepRecord {
    pub fn new(job_id: &str, step_id: &str, output: Value, attempts: u32) -> Self {
        Self {
            id: Self::record_id(job_id, step_id),
            job_id: job_id.to_string(),
            step_id: step_id.to_string(),
            output,
            attempts,
            completed_at: now_ms(),
        }
    }

    pub fn record_id(job_id: &str, step_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(job_id.as_bytes());
        hasher.update(b":");
        hasher.update(step_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl HasId for StepRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection() -> &'static str {
        "steps"
    }
}
