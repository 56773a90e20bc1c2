//! Run history of tasks, persisted through a [`TaskStore`]

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use taskdeck_core::config::HistoryConfig;
use taskdeck_core::StoreError;
use taskdeck_prompts::Answers;

use crate::store::{TaskRecord, TaskStore};
use crate::task::TaskStatus;

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Run id
    pub id: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Derived on read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl HistoryRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
            homepage: None,
        }
    }
}

/// Put `run_id` at the front of `history`, keeping at most `max` records.
/// A run id already present stays where it is.
pub fn push_record(history: &mut Vec<HistoryRecord>, run_id: &str, max: usize) {
    if !history.iter().any(|r| r.id == run_id) {
        history.insert(0, HistoryRecord::new(run_id));
    }
    history.truncate(max);
}

/// Set the status of the record of `run_id`, or of the newest record when
/// that run is unknown. Returns whether a record changed.
pub fn set_status(history: &mut [HistoryRecord], run_id: Option<&str>, status: TaskStatus) -> bool {
    let index = run_id
        .and_then(|id| history.iter().position(|r| r.id == id))
        .or(if history.is_empty() { None } else { Some(0) });
    match index {
        Some(i) => {
            history[i].status = Some(status);
            true
        }
        None => false,
    }
}

/// Expand a homepage template; `{project}` and `{id}` are substituted.
/// Without a template the homepage is empty.
pub fn homepage(template: Option<&str>, project_id: &str, run_id: &str) -> String {
    match template {
        Some(template) => template
            .replace("{project}", project_id)
            .replace("{id}", run_id),
        None => String::new(),
    }
}

/// Run id used when the client supplies no label
pub fn generate_run_id(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// History and saved-answer access on top of a task store
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn TaskStore>,
    max_records: usize,
    homepage: Option<String>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn TaskStore>, config: &HistoryConfig) -> Self {
        Self {
            store,
            max_records: config.max_records,
            homepage: config.homepage.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Record the start of a run
    pub async fn add(&self, task_id: &str, run_id: &str) -> Result<(), StoreError> {
        let mut history = self
            .store
            .get(task_id)
            .await?
            .and_then(|r| r.history)
            .unwrap_or_default();
        push_record(&mut history, run_id, self.max_records);
        debug!(task = task_id, run = run_id, "history entry added");
        self.store
            .upsert(TaskRecord::new(task_id).with_history(history))
            .await
    }

    /// Mirror a status change into the run's record. Tasks without a
    /// persisted record are left alone.
    pub async fn update_status(
        &self,
        task_id: &str,
        run_id: Option<&str>,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let record = match self.store.get(task_id).await? {
            Some(record) => record,
            None => return Ok(()),
        };
        let mut history = record.history.unwrap_or_default();
        if set_status(&mut history, run_id, status) {
            self.store
                .upsert(TaskRecord::new(task_id).with_history(history))
                .await?;
        }
        Ok(())
    }

    /// History of a task, newest first, with homepages filled in
    pub async fn list(&self, task_id: &str, project_id: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let history = self
            .store
            .get(task_id)
            .await?
            .and_then(|r| r.history)
            .unwrap_or_default();
        Ok(history
            .into_iter()
            .map(|mut record| {
                record.homepage = Some(self.homepage(project_id, &record.id));
                record
            })
            .collect())
    }

    pub fn homepage(&self, project_id: &str, run_id: &str) -> String {
        homepage(self.homepage.as_deref(), project_id, run_id)
    }

    pub async fn save_answers(&self, task_id: &str, answers: Answers) -> Result<(), StoreError> {
        self.store
            .upsert(TaskRecord::new(task_id).with_answers(answers))
            .await
    }

    pub async fn saved_answers(&self, task_id: &str) -> Result<Option<Answers>, StoreError> {
        Ok(self.store.get(task_id).await?.and_then(|r| r.answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn history_store() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::new()), &HistoryConfig::default())
    }

    #[test]
    fn test_cap_keeps_newest_first() {
        let mut history = Vec::new();
        for i in 1..=11 {
            push_record(&mut history, &format!("run-{}", i), 10);
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].id, "run-11");
        assert_eq!(history[9].id, "run-2");
    }

    #[test]
    fn test_repeated_run_id_is_not_duplicated() {
        let mut history = Vec::new();
        push_record(&mut history, "a", 10);
        push_record(&mut history, "b", 10);
        push_record(&mut history, "a", 10);
        let ids: Vec<_> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_set_status_prefers_current_run() {
        let mut history = vec![HistoryRecord::new("new"), HistoryRecord::new("old")];
        assert!(set_status(&mut history, Some("old"), TaskStatus::Error));
        assert_eq!(history[1].status, Some(TaskStatus::Error));
        assert_eq!(history[0].status, None);

        assert!(set_status(&mut history, Some("gone"), TaskStatus::Done));
        assert_eq!(history[0].status, Some(TaskStatus::Done));

        assert!(!set_status(&mut [], None, TaskStatus::Done));
    }

    #[test]
    fn test_homepage_template() {
        assert_eq!(homepage(None, "web", "r1"), "");
        assert_eq!(
            homepage(Some("https://beta.example.com/{project}/{id}/"), "web", "r1"),
            "https://beta.example.com/web/r1/"
        );
    }

    #[test]
    fn test_generated_run_id() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(generate_run_id(now), "20240305140709");
    }

    #[tokio::test]
    async fn test_store_add_and_update() {
        let store = history_store();
        for i in 1..=11 {
            store.add("web:deploy", &format!("r{}", i)).await.unwrap();
        }
        store
            .update_status("web:deploy", Some("r11"), TaskStatus::Running)
            .await
            .unwrap();

        let history = store.list("web:deploy", "web").await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].id, "r11");
        assert_eq!(history[0].status, Some(TaskStatus::Running));
        assert_eq!(history[0].homepage.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_update_without_record_is_noop() {
        let store = history_store();
        store
            .update_status("web:build", None, TaskStatus::Done)
            .await
            .unwrap();
        assert!(store.store().get("web:build").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_answers_roundtrip_keeps_history() {
        let store = history_store();
        store.add("web:deploy", "r1").await.unwrap();

        let mut answers = Answers::new();
        answers.insert("msg".to_string(), serde_json::json!("ship it"));
        store.save_answers("web:deploy", answers.clone()).await.unwrap();

        assert_eq!(store.saved_answers("web:deploy").await.unwrap(), Some(answers));
        assert_eq!(store.list("web:deploy", "web").await.unwrap().len(), 1);
    }
}
