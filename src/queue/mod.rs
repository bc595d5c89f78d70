//! Durable job queue and the worker that drains it
//!
//! Jobs are persisted in the `jobs` collection, so a job enqueued by one
//! process can be picked up by a worker in another. Each enqueue is claimed
//! exactly once; failed attempts are re-queued with backoff and resume from
//! the step ledger.

mod job_queue;
mod worker;

pub use job_queue::JobQueue;
pub use worker::{JobHandler, Worker, WorkerConfig, WorkerStats};
