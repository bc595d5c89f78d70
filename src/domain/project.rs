//! Project records: the container a conversation belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_project_id;
use crate::storage::HasId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_project_id(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasId for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection() -> &'static str {
        "projects"
    }
}
