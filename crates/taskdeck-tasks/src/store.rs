//! Persisted per-task data (saved answers and run history)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use taskdeck_core::StoreError;
use taskdeck_prompts::Answers;

use crate::history::HistoryRecord;

/// Persisted record of one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id ("project:name")
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Answers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryRecord>>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_answers(mut self, answers: Answers) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryRecord>) -> Self {
        self.history = Some(history);
        self
    }

    /// Overwrite the fields present in `update`, keep the others
    pub fn merge(&mut self, update: TaskRecord) {
        if update.answers.is_some() {
            self.answers = update.answers;
        }
        if update.history.is_some() {
            self.history = update.history;
        }
    }
}

/// Key-value persistence of task records
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError>;

    /// Insert the record, or merge it into the existing one
    async fn upsert(&self, record: TaskRecord) -> Result<(), StoreError>;
}

/// Store kept in memory only
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(task_id).cloned())
    }

    async fn upsert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        match records.get_mut(&record.id) {
            Some(existing) => existing.merge(record),
            None => {
                records.insert(record.id.clone(), record);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// Store backed by a JSON file (`{"tasks": [...]}`)
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Database, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Database::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Database::default()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn save(&self, db: &Database) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }
        let json = serde_json::to_vec_pretty(db)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        let db = self.load().await?;
        Ok(db.tasks.into_iter().find(|r| r.id == task_id))
    }

    async fn upsert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut db = self.load().await?;
        match db.tasks.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => existing.merge(record),
            None => db.tasks.push(record),
        }
        self.save(&db).await?;
        debug!(path = %self.path.display(), "task store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn answers(msg: &str) -> Answers {
        let mut answers = Answers::new();
        answers.insert("msg".to_string(), json!(msg));
        answers
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut record = TaskRecord::new("web:build").with_answers(answers("hi"));
        record.merge(TaskRecord::new("web:build").with_history(vec![HistoryRecord::new("r1")]));
        assert_eq!(record.answers, Some(answers("hi")));
        assert_eq!(record.history.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_upsert() {
        let store = MemoryStore::new();
        assert!(store.get("web:build").await.unwrap().is_none());

        store
            .upsert(TaskRecord::new("web:build").with_answers(answers("a")))
            .await
            .unwrap();
        store
            .upsert(TaskRecord::new("web:build").with_answers(answers("b")))
            .await
            .unwrap();

        let record = store.get("web:build").await.unwrap().unwrap();
        assert_eq!(record.answers, Some(answers("b")));
    }

    #[tokio::test]
    async fn test_json_file_store_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("db.json");

        let store = JsonFileStore::new(&path);
        let mut record = HistoryRecord::new("r1");
        record.status = Some(TaskStatus::Done);
        store
            .upsert(TaskRecord::new("web:deploy").with_history(vec![record]))
            .await
            .unwrap();
        store
            .upsert(TaskRecord::new("web:deploy").with_answers(answers("ship")))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let stored = reopened.get("web:deploy").await.unwrap().unwrap();
        assert_eq!(stored.answers, Some(answers("ship")));
        assert_eq!(
            stored.history.unwrap()[0].status,
            Some(TaskStatus::Done)
        );
        assert!(reopened.get("web:other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("web:build").await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
