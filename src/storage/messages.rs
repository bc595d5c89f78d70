//! Message-specific storage helpers.

use super::traits::{Filter, Storage};
use crate::domain::{Message, NewMessage};
use crate::error::Result;

/// Helper for message queries.
pub struct MessageStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> MessageStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Persist a new message (and its fragment, if any).
    pub fn create(&self, new: NewMessage) -> Result<Message> {
        let message = Message::from_new(new);
        self.storage.create(&message)?;
        log::debug!(
            "Created {:?}/{:?} message {} in project {}",
            message.role,
            message.message_type,
            message.id,
            message.project_id
        );
        Ok(message)
    }

    /// Persist `new` under `id` unless a message with that id already exists,
    /// in which case the stored message is returned unchanged.
    pub fn create_once(&self, id: &str, new: NewMessage) -> Result<Message> {
        if let Some(existing) = self.get(id)? {
            log::debug!("Message {} already saved, reusing it", id);
            return Ok(existing);
        }
        let message = Message::from_new_with_id(new, id.to_string());
        self.storage.create(&message)?;
        log::debug!(
            "Created {:?}/{:?} message {} in project {}",
            message.role,
            message.message_type,
            message.id,
            message.project_id
        );
        Ok(message)
    }

    pub fn get(&self, id: &str) -> Result<Option<Message>> {
        self.storage.get(id)
    }

    /// All messages of a project, oldest first.
    pub fn find_by_project(&self, project_id: &str) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self.storage.query(&[Filter::eq("project_id", project_id)])?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// All messages of a project, newest first.
    pub fn find_by_project_newest_first(&self, project_id: &str) -> Result<Vec<Message>> {
        let mut messages = self.find_by_project(project_id)?;
        messages.reverse();
        Ok(messages)
    }

    /// Most recent message carrying a fragment.
    pub fn latest_fragment_message(&self, project_id: &str) -> Result<Option<Message>> {
        Ok(self
            .find_by_project_newest_first(project_id)?
            .into_iter()
            .find(|m| m.fragment.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileMap, MessageRole, MessageType, NewFragment};
    use crate::storage::JsonlStorage;
    use tempfile::TempDir;

    fn create_test_storage() -> (JsonlStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_create_once_keeps_first_message() {
        let (storage, _temp) = create_test_storage();
        let store = MessageStore::new(&storage);

        let first = store.create_once("msg-fixed", NewMessage::error("prj-1", "first")).unwrap();
        let again = store.create_once("msg-fixed", NewMessage::error("prj-1", "second")).unwrap();

        assert_eq!(first, again);
        assert_eq!(again.content, "first");
        assert_eq!(store.find_by_project("prj-1").unwrap().len(), 1);
    }

    #[test]
    fn test_create_and_get_message() {
        let (storage, _temp) = create_test_storage();
        let store = MessageStore::new(&storage);

        let created = store.create(NewMessage::user("prj-1", "hello")).unwrap();
        let retrieved = store.get(&created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_find_by_project_filters_and_orders() {
        let (storage, _temp) = create_test_storage();
        let store = MessageStore::new(&storage);

        store.create(NewMessage::user("prj-1", "first")).unwrap();
        store.create(NewMessage::user("prj-2", "other")).unwrap();
        store.create(NewMessage::error("prj-1", "second")).unwrap();

        let oldest_first: Vec<String> = store
            .find_by_project("prj-1")
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(oldest_first, vec!["first", "second"]);

        let newest_first = store.find_by_project_newest_first("prj-1").unwrap();
        assert_eq!(newest_first[0].content, "second");
        assert_eq!(newest_first[0].role, MessageRole::Assistant);
        assert_eq!(newest_first[0].message_type, MessageType::Error);
    }

    #[test]
    fn test_latest_fragment_message() {
        let (storage, _temp) = create_test_storage();
        let store = MessageStore::new(&storage);

        assert!(store.latest_fragment_message("prj-1").unwrap().is_none());

        let mut files = FileMap::new();
        files.insert("index.html".to_string(), "<h1>hi</h1>".to_string());
        store
            .create(NewMessage::result(
                "prj-1",
                "Here you go",
                NewFragment {
                    sandbox_url: "http://localhost:3000".to_string(),
                    title: "Hi".to_string(),
                    files,
                },
            ))
            .unwrap();
        store.create(NewMessage::user("prj-1", "thanks")).unwrap();

        let latest = store.latest_fragment_message("prj-1").unwrap().unwrap();
        assert_eq!(latest.fragment.unwrap().title, "Hi");
    }
}
