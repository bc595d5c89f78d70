//! Job handlers - the durable functions run by the worker.

mod code_agent;

pub use code_agent::{CodeAgentConfig, CodeAgentFunction, ERROR_MESSAGE};
