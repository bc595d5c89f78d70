//! Credit ledger: a fixed-window points allowance per user key.
//!
//! Each generation costs `cost` points out of `points` per window. The first
//! consumption opens a window of `duration`; once it elapses the allowance
//! resets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::now_ms;
use crate::storage::{HasId, JsonlStorage, Storage};

/// Key used when the caller has no identity of its own
pub const DEFAULT_KEY: &str = "local";

#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// Allowance used up for the current window
    #[error("Out of credits, next point in {ms_before_next}ms")]
    Exhausted { ms_before_next: i64 },

    #[error("Credit backend error: {0}")]
    Backend(String),
}

impl From<crate::error::VibeError> for CreditError {
    fn from(err: crate::error::VibeError) -> Self {
        CreditError::Backend(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditStatus {
    pub remaining_points: u32,
    pub consumed_points: u32,
    /// Time until the window resets; 0 when no window is open
    pub ms_before_next: i64,
}

pub trait CreditLedger: Send + Sync {
    /// Take one generation's cost from `key`'s allowance
    fn consume(&self, key: &str) -> Result<CreditStatus, CreditError>;

    /// Remaining allowance, without consuming
    fn status(&self, key: &str) -> Result<CreditStatus, CreditError>;
}

#[derive(Debug, Clone)]
pub struct CreditConfig {
    pub points: u32,
    pub duration: Duration,
    pub cost: u32,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            points: 5,
            duration: Duration::from_secs(30 * 24 * 60 * 60),
            cost: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UsageRecord {
    id: String,
    consumed_points: u32,
    window_start: i64,
}

impl HasId for UsageRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection() -> &'static str {
        "usage"
    }
}

/// [`CreditLedger`] persisted in the `usage` collection
pub struct UsageLedger {
    storage: Arc<JsonlStorage>,
    config: CreditConfig,
    lock: Mutex<()>,
}

impl UsageLedger {
    pub fn new(storage: Arc<JsonlStorage>, config: CreditConfig) -> Self {
        Self {
            storage,
            config,
            lock: Mutex::new(()),
        }
    }

    fn window_ms(&self) -> i64 {
        self.config.duration.as_millis() as i64
    }

    /// Current window for `key`, or `None` if it never opened or has expired
    fn current(&self, key: &str, now: i64) -> Result<Option<UsageRecord>, CreditError> {
        let record: Option<UsageRecord> = self.storage.get(key)?;
        Ok(record.filter(|r| now < r.window_start + self.window_ms()))
    }

    fn status_of(&self, record: Option<&UsageRecord>, now: i64) -> CreditStatus {
        match record {
            Some(r) => CreditStatus {
                remaining_points: self.config.points.saturating_sub(r.consumed_points),
                consumed_points: r.consumed_points,
                ms_before_next: (r.window_start + self.window_ms() - now).max(0),
            },
            None => CreditStatus {
                remaining_points: self.config.points,
                consumed_points: 0,
                ms_before_next: 0,
            },
        }
    }
}

impl CreditLedger for UsageLedger {
    fn consume(&self, key: &str) -> Result<CreditStatus, CreditError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| CreditError::Backend(format!("usage lock poisoned: {}", e)))?;
        let now = now_ms();

        let mut record = self.current(key, now)?.unwrap_or_else(|| UsageRecord {
            id: key.to_string(),
            consumed_points: 0,
            window_start: now,
        });

        if record.consumed_points + self.config.cost > self.config.points {
            let status = self.status_of(Some(&record), now);
            log::info!("Credits exhausted for {} ({}ms until reset)", key, status.ms_before_next);
            return Err(CreditError::Exhausted {
                ms_before_next: status.ms_before_next,
            });
        }

        record.consumed_points += self.config.cost;
        self.storage.upsert(&record)?;
        Ok(self.status_of(Some(&record), now))
    }

    fn status(&self, key: &str) -> Result<CreditStatus, CreditError> {
        let now = now_ms();
        let record = self.current(key, now)?;
        Ok(self.status_of(record.as_ref(), now))
    }
}
