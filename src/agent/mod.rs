//! Coding agent: state, the tool-calling network and post-processing
//!
//! A run seeds [`AgentState`] from project history, loops the coding agent
//! until it emits a `<task_summary>` block (or hits the iteration ceiling),
//! then asks two single-shot agents for a fragment title and a reply.

pub mod history;
pub mod network;
pub mod output;
pub mod postprocess;
pub mod prompts;
pub mod sentinel;
pub mod state;

pub use history::{Conversation, HistoryEntry, build_conversation};
pub use network::{Agent, AgentNetwork, NetworkConfig, NetworkRun, Router, SummaryRouter};
pub use output::{FALLBACK_TEXT, OutputMessage, normalize_output};
pub use postprocess::{PostProcessed, PostProcessor};
pub use sentinel::extract_task_summary;
pub use state::{AgentState, StateHandle};
