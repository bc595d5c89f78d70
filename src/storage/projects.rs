//! Project-specific storage helpers.

use super::traits::Storage;
use crate::domain::Project;
use crate::error::Result;

/// Helper for project queries.
pub struct ProjectStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> ProjectStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn create(&self, name: &str) -> Result<Project> {
        let project = Project::new(name);
        self.storage.create(&project)?;
        log::info!("Created project {} ({})", project.id, project.name);
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Result<Option<Project>> {
        self.storage.get(id)
    }

    /// All projects, most recently updated first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.storage.list()?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonlStorage;
    use tempfile::TempDir;

    #[test]
    fn test_create_get_list() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        let store = ProjectStore::new(&storage);

        let a = store.create("alpha").unwrap();
        let b = store.create("beta").unwrap();

        assert_eq!(store.get(&a.id).unwrap().unwrap().name, "alpha");
        assert!(store.get("prj-missing").unwrap().is_none());

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id) && ids.contains(&b.id));
    }
}
