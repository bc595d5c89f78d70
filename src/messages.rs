//! Message procedures: list a project's conversation and submit a request.

use std::sync::Arc;

use crate::credits::{CreditError, CreditLedger};
use crate::domain::{CODE_AGENT_RUN, CodeAgentRun, JobEvent, Message, NewMessage};
use crate::error::{Result, VibeError};
use crate::queue::JobQueue;
use crate::storage::{JsonlStorage, MessageStore, ProjectStore, Storage};

pub const MAX_VALUE_CHARS: usize = 10_000;

pub struct MessageService {
    storage: Arc<JsonlStorage>,
    queue: Arc<JobQueue>,
    credits: Arc<dyn CreditLedger>,
    credit_key: String,
}

impl MessageService {
    pub fn new(
        storage: Arc<JsonlStorage>,
        queue: Arc<JobQueue>,
        credits: Arc<dyn CreditLedger>,
        credit_key: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            queue,
            credits,
            credit_key: credit_key.into(),
        }
    }

    /// All messages of a project, least recently updated first, fragments included
    pub fn get_many(&self, project_id: &str) -> Result<Vec<Message>> {
        let mut messages = MessageStore::new(self.storage.as_ref()).find_by_project(project_id)?;
        messages.sort_by_key(|m| m.updated_at);
        Ok(messages)
    }

    /// Record the user's request and enqueue the agent run for it
    pub fn create(&self, project_id: &str, value: &str) -> Result<Message> {
        validate(project_id, value)?;

        if ProjectStore::new(self.storage.as_ref()).get(project_id)?.is_none() {
            return Err(VibeError::NotFound("Project not found".to_string()));
        }

        match self.credits.consume(&self.credit_key) {
            Ok(status) => log::debug!("Credit consumed, {} remaining", status.remaining_points),
            Err(CreditError::Exhausted { .. }) => {
                return Err(VibeError::TooManyRequests("You have run out of credits".to_string()));
            }
            Err(CreditError::Backend(e)) => {
                log::error!("Credit ledger failure: {}", e);
                return Err(VibeError::BadRequest("Something went wrong".to_string()));
            }
        }

        let event = JobEvent::new(
            CODE_AGENT_RUN,
            CodeAgentRun {
                value: value.to_string(),
                project_id: project_id.to_string(),
            },
        )?;
        let message = MessageStore::new(self.storage.as_ref()).create(NewMessage::user(project_id, value))?;

        // A request without a job would never get a reply
        if let Err(e) = self.queue.enqueue(event) {
            log::error!("Failed to enqueue run for message {}: {}", message.id, e);
            self.storage.delete::<Message>(&message.id)?;
            return Err(e);
        }
        Ok(message)
    }
}

fn validate(project_id: &str, value: &str) -> Result<()> {
    let chars = value.chars().count();
    if chars == 0 {
        return Err(VibeError::BadRequest("Value is required".to_string()));
    }
    if chars > MAX_VALUE_CHARS {
        return Err(VibeError::BadRequest("Value is too long".to_string()));
    }
    if project_id.is_empty() {
        return Err(VibeError::BadRequest("Project ID is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::{CreditConfig, CreditStatus, UsageLedger};
    use crate::domain::{JobStatus, MessageRole, MessageType};
    use crate::storage::JobStore;
    use tempfile::TempDir;

    struct BrokenLedger;

    impl CreditLedger for BrokenLedger {
        fn consume(&self, _key: &str) -> std::result::Result<CreditStatus, CreditError> {
            Err(CreditError::Backend("connection refused".to_string()))
        }

        fn status(&self, _key: &str) -> std::result::Result<CreditStatus, CreditError> {
            Err(CreditError::Backend("connection refused".to_string()))
        }
    }

    fn setup(temp: &TempDir, credits: Arc<dyn CreditLedger>) -> (MessageService, Arc<JsonlStorage>, String) {
        let storage = Arc::new(JsonlStorage::new(temp.path()).unwrap());
        let project = ProjectStore::new(storage.as_ref()).create("demo").unwrap();
        let queue = Arc::new(JobQueue::new(storage.clone()));
        (MessageService::new(storage.clone(), queue, credits, "local"), storage, project.id)
    }

    fn usage(temp: &TempDir, points: u32) -> Arc<dyn CreditLedger> {
        Arc::new(UsageLedger::new(
            Arc::new(JsonlStorage::new(temp.path().join("credits")).unwrap()),
            CreditConfig {
                points,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_create_persists_user_message_and_enqueues_run() {
        let temp = TempDir::new().unwrap();
        let (service, storage, project_id) = setup(&temp, usage(&temp, 5));

        let message = service.create(&project_id, "build a todo app").unwrap();

        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.message_type, MessageType::Result);
        assert!(message.fragment.is_none());

        let jobs = JobStore::new(storage.as_ref()).find_by_status(JobStatus::Pending).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, CODE_AGENT_RUN);
        let run: CodeAgentRun = serde_json::from_value(jobs[0].data.clone()).unwrap();
        assert_eq!(run.value, "build a todo app");
        assert_eq!(run.project_id, project_id);
    }

    #[test]
    fn test_validation_messages() {
        let temp = TempDir::new().unwrap();
        let (service, _, project_id) = setup(&temp, usage(&temp, 5));

        let cases = [
            (project_id.as_str(), String::new(), "Value is required"),
            (project_id.as_str(), "x".repeat(MAX_VALUE_CHARS + 1), "Value is too long"),
            ("", "hello".to_string(), "Project ID is required"),
        ];
        for (project, value, expected) in cases {
            match service.create(project, &value) {
                Err(VibeError::BadRequest(msg)) => assert_eq!(msg, expected),
                other => panic!("expected BadRequest({}), got {:?}", expected, other.map(|m| m.id)),
            }
        }
        assert!(service.create(&project_id, &"x".repeat(MAX_VALUE_CHARS)).is_ok());
    }

    #[test]
    fn test_unknown_project_is_not_found() {
        let temp = TempDir::new().unwrap();
        let (service, _, _) = setup(&temp, usage(&temp, 5));

        let err = service.create("prj-missing", "hello").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Not found: Project not found");
    }

    #[test]
    fn test_credit_refusals_map_to_distinct_codes() {
        let temp = TempDir::new().unwrap();
        let (service, storage, project_id) = setup(&temp, usage(&temp, 1));
        service.create(&project_id, "first").unwrap();

        let exhausted = service.create(&project_id, "second").unwrap_err();
        assert_eq!(exhausted.code(), "TOO_MANY_REQUESTS");
        assert_eq!(exhausted.to_string(), "Too many requests: You have run out of credits");

        let other = TempDir::new().unwrap();
        let (broken, _, other_project) = setup(&other, Arc::new(BrokenLedger));
        let failed = broken.create(&other_project, "hello").unwrap_err();
        assert_eq!(failed.code(), "BAD_REQUEST");
        assert_eq!(failed.to_string(), "Bad request: Something went wrong");

        // refused requests leave no message behind
        assert_eq!(service.get_many(&project_id).unwrap().len(), 1);
        assert_eq!(JobStore::new(storage.as_ref()).list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_enqueue_leaves_no_orphan_request() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(JsonlStorage::new(temp.path().join("data")).unwrap());
        let project = ProjectStore::new(storage.as_ref()).create("demo").unwrap();
        // A directory where the jobs file belongs makes every enqueue fail
        std::fs::create_dir_all(temp.path().join("queue/jobs.jsonl")).unwrap();
        let queue = Arc::new(JobQueue::new(Arc::new(JsonlStorage::new(temp.path().join("queue")).unwrap())));
        let service = MessageService::new(storage, queue, usage(&temp, 5), "local");

        assert!(service.create(&project.id, "build a todo app").is_err());
        assert!(service.get_many(&project.id).unwrap().is_empty());
    }

    #[test]
    fn test_get_many_is_chronological() {
        let temp = TempDir::new().unwrap();
        let (service, _, project_id) = setup(&temp, usage(&temp, 5));
        service.create(&project_id, "one").unwrap();
        service.create(&project_id, "two").unwrap();

        let contents: Vec<String> = service
            .get_many(&project_id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two"]);
    }
}
