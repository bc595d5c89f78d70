//! Storage layer for Vibe - JSONL persistence with in-memory caching.
//!
//! Records implement [`HasId`] to name their collection. Typed helpers wrap a
//! borrowed [`Storage`] for the queries each record type needs.

mod jsonl;
mod jobs;
mod messages;
mod projects;
mod traits;

pub use jobs::JobStore;
pub use jsonl::JsonlStorage;
pub use messages::MessageStore;
pub use projects::ProjectStore;
pub use traits::{Filter, FilterOp, HasId, Storage};
