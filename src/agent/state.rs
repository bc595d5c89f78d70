//! Per-job agent state: the task summary and the files written so far.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::FileMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Set once the agent emits its task summary; empty while running
    pub summary: String,
    pub files: FileMap,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A non-empty summary is the only termination signal
    pub fn is_done(&self) -> bool {
        !self.summary.is_empty()
    }

    /// Failure predicate applied after the loop ends
    pub fn is_error(&self) -> bool {
        self.summary.is_empty() || self.files.is_empty()
    }
}

/// Shared handle to one job's [`AgentState`].
///
/// All mutation goes through the mutex, so merges issued by concurrent tool
/// calls of one turn are applied one at a time against the current files.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<Mutex<AgentState>>,
}

impl StateHandle {
    pub fn new(state: AgentState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Merge `files` into the current mapping; later writes to a path win
    pub async fn merge_files(&self, files: FileMap) {
        let mut state = self.inner.lock().await;
        state.files.extend(files);
    }

    pub async fn set_summary(&self, summary: impl Into<String>) {
        self.inner.lock().await.summary = summary.into();
    }

    pub async fn is_done(&self) -> bool {
        self.inner.lock().await.is_done()
    }

    pub async fn snapshot(&self) -> AgentState {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(pairs: &[(&str, &str)]) -> FileMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_error_classification() {
        let no_summary = AgentState {
            summary: String::new(),
            files: files(&[("a", "1")]),
        };
        let no_files = AgentState {
            summary: "done".to_string(),
            files: FileMap::new(),
        };
        let success = AgentState {
            summary: "done".to_string(),
            files: files(&[("a", "1")]),
        };

        assert!(no_summary.is_error());
        assert!(no_files.is_error());
        assert!(!success.is_error());
    }

    #[test]
    fn test_new_state_is_empty_and_running() {
        let state = AgentState::new();
        assert_eq!(state.summary, "");
        assert!(state.files.is_empty());
        assert!(!state.is_done());
    }

    #[tokio::test]
    async fn test_sequential_merges_accumulate() {
        let handle = StateHandle::default();
        handle.merge_files(files(&[("a.txt", "x")])).await;
        handle.merge_files(files(&[("b.txt", "y")])).await;

        assert_eq!(handle.snapshot().await.files, files(&[("a.txt", "x"), ("b.txt", "y")]));
    }

    #[tokio::test]
    async fn test_concurrent_merges_do_not_lose_updates() {
        let handle = StateHandle::default();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    let path = format!("f{}.txt", i);
                    handle.merge_files(files(&[(path.as_str(), "x")])).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(handle.snapshot().await.files.len(), 16);
    }

    #[tokio::test]
    async fn test_set_summary_marks_done() {
        let handle = StateHandle::default();
        assert!(!handle.is_done().await);
        handle.set_summary("Built a landing page").await;
        assert!(handle.is_done().await);
    }
}
