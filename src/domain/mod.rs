//! Domain types for Vibe
//!
//! - Project: container for one conversation
//! - Message / Fragment: the persisted chat, append-only
//! - JobRecord: durable queue entry for a background event
//! - StepRecord: checkpointed output of one step of a job

pub mod job;
pub mod message;
pub mod project;
pub mod step;

pub use job::{CODE_AGENT_RUN, CodeAgentRun, JobEvent, JobRecord, JobStatus};
pub use message::{FileMap, Fragment, Message, MessageRole, MessageType, NewFragment, NewMessage};
pub use project::Project;
pub use step::StepRecord;
