//! ID generation utilities for Vibe
//!
//! Provides functions for generating unique identifiers for projects, messages, and jobs.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn generate_prefixed_id(prefix: &str) -> String {
    let random: u32 = rand::rng().random();
    format!("{}-{}-{:08x}", prefix, now_ms(), random)
}

/// Generate a project ID
///
/// Format: `prj-{timestamp_ms}-{random_hex}`
pub fn generate_project_id() -> String {
    generate_prefixed_id("prj")
}

/// Generate a message ID
///
/// Format: `msg-{timestamp_ms}-{random_hex}`
pub fn generate_message_id() -> String {
    generate_prefixed_id("msg")
}

/// ID of the single outcome message a job writes.
///
/// Format: `msg-{16 hex chars of sha256(job_id)}`; stable across replays.
pub fn outcome_message_id(job_id: &str) -> String {
    let digest = Sha256::digest(job_id.as_bytes());
    format!("msg-{}", &hex::encode(digest)[..16])
}

/// Generate a fragment ID
pub fn generate_fragment_id() -> String {
    generate_prefixed_id("frg")
}

/// Generate a job ID
///
/// Format: `job-{timestamp_ms}-{random_hex}`
pub fn generate_job_id() -> String {
    generate_prefixed_id("job")
}

/// Generate a sandbox ID for locally provisioned sandboxes
pub fn generate_sandbox_id() -> String {
    let random: u64 = rand::rng().random();
    format!("sbx{:016x}", random)
}

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "clever", "crisp", "eager", "gentle", "golden", "lively", "lucky", "mellow", "quiet",
    "rapid", "shiny", "silver", "sunny", "swift", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "canyon", "comet", "falcon", "forest", "harbor", "island", "lantern", "meadow", "otter", "panda",
    "pebble", "river", "rocket", "sparrow", "summit", "tiger", "valley", "willow", "zephyr",
];

/// Generate a readable default project name such as `swift-otter`
pub fn generate_project_name() -> String {
    let mut rng = rand::rng();
    format!(
        "{}-{}",
        ADJECTIVES[rng.random_range(0..ADJECTIVES.len())],
        NOUNS[rng.random_range(0..NOUNS.len())]
    )
}
