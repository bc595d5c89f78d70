//! Durable steps - checkpointed units of work inside a job
//!
//! Every side-effecting operation of a job runs as a named step. The first
//! successful output is recorded in the [`StepLedger`]; a replayed job gets
//! the recorded output back instead of repeating the effect.

mod ledger;
mod runner;

pub use ledger::StepLedger;
pub use runner::{RetryPolicy, StepRunner};
