//! Vibe - a natural-language coding assistant
//!
//! A request becomes a `code-agent/run` job. The job provisions a sandbox,
//! drives a tool-calling agent inside it until the agent reports a task
//! summary, and persists exactly one outcome message: a RESULT with the
//! generated files, or a fixed ERROR.

pub mod agent;
pub mod credits;
pub mod domain;
pub mod error;
pub mod id;
pub mod llm;
pub mod messages;
pub mod queue;
pub mod runner;
pub mod sandbox;
pub mod steps;
pub mod storage;
pub mod tree;

pub use error::{Result, VibeError};
