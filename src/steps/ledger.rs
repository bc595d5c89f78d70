//! Persisted map of `(job_id, step_id)` to step output.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::StepRecord;
use crate::error::Result;
use crate::storage::{Filter, JsonlStorage, Storage};

#[derive(Debug, Clone)]
pub struct StepLedger {
    storage: Arc<JsonlStorage>,
}

impl StepLedger {
    pub fn new(storage: Arc<JsonlStorage>) -> Self {
        Self { storage }
    }

    pub fn get(&self, job_id: &str, step_id: &str) -> Result<Option<StepRecord>> {
        self.storage.get(&StepRecord::record_id(job_id, step_id))
    }

    /// Record a step's output. Recording the same step twice keeps the latest.
    pub fn record(&self, job_id: &str, step_id: &str, output: Value, attempts: u32) -> Result<()> {
        self.storage.upsert(&StepRecord::new(job_id, step_id, output, attempts))
    }

    /// Completed steps of a job, in completion order
    pub fn steps_for_job(&self, job_id: &str) -> Result<Vec<StepRecord>> {
        let mut steps: Vec<StepRecord> = self.storage.query(&[Filter::eq("job_id", job_id)])?;
        steps.sort_by_key(|s| s.completed_at);
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ledger() -> (StepLedger, TempDir) {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(JsonlStorage::new(temp.path()).unwrap());
        (StepLedger::new(storage), temp)
    }

    #[test]
    fn test_record_and_get() {
        let (ledger, _temp) = ledger();
        assert!(ledger.get("job-1", "get-sandbox-id").unwrap().is_none());

        ledger.record("job-1", "get-sandbox-id", json!("sbx1"), 1).unwrap();

        let record = ledger.get("job-1", "get-sandbox-id").unwrap().unwrap();
        assert_eq!(record.output, json!("sbx1"));
        assert!(ledger.get("job-2", "get-sandbox-id").unwrap().is_none());
    }

    #[test]
    fn test_steps_for_job() {
        let (ledger, _temp) = ledger();
        ledger.record("job-1", "get-sandbox-id", json!("sbx1"), 1).unwrap();
        ledger.record("job-1", "turn-1/inference", json!({}), 2).unwrap();
        ledger.record("job-2", "get-sandbox-id", json!("sbx2"), 1).unwrap();

        let steps: Vec<String> = ledger
            .steps_for_job("job-1")
            .unwrap()
            .into_iter()
            .map(|s| s.step_id)
            .collect();
        assert_eq!(steps, vec!["get-sandbox-id", "turn-1/inference"]);
    }
}
