//! Per-project collections of tasks and their runtime state

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use taskdeck_core::Project;

use crate::task::{TaskDescriptor, TaskId, TaskLog, TaskSnapshot, TaskStatus};
use crate::terminate::ProcessHandle;

/// Mutable state of a task, guarded by the entry's lock
#[derive(Debug, Default)]
pub(crate) struct TaskRuntime {
    pub status: TaskStatus,
    pub logs: VecDeque<TaskLog>,
    /// Present only while the process runs
    pub process: Option<ProcessHandle>,
    pub started: Option<Instant>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set by a stop request
    pub terminating: bool,
    /// Held by the run being prepared, until it turns `running` or gives up
    pub starting: bool,
    /// History id of the latest run
    pub run_id: Option<String>,
    /// Incremented by every run, used to drop stale exit events
    pub generation: u64,
}

/// A task registered for a project
#[derive(Debug)]
pub struct TaskEntry {
    id: TaskId,
    key: String,
    descriptor: TaskDescriptor,
    project_path: PathBuf,
    max_logs: usize,
    runtime: Mutex<TaskRuntime>,
}

impl TaskEntry {
    pub fn new(project: &Project, descriptor: TaskDescriptor, max_logs: usize) -> Self {
        let id = TaskId::new(project.id.clone(), descriptor.name.clone());
        Self {
            key: id.to_string(),
            id,
            descriptor,
            project_path: project.path.clone(),
            max_logs: max_logs.max(1),
            runtime: Mutex::new(TaskRuntime::default()),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// "project:name"
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub(crate) fn runtime(&self) -> MutexGuard<'_, TaskRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> TaskStatus {
        self.runtime().status
    }

    pub fn logs(&self) -> Vec<TaskLog> {
        self.runtime().logs.iter().cloned().collect()
    }

    /// Append a log entry, evicting the oldest one when full
    pub(crate) fn push_log(&self, log: TaskLog) {
        let mut runtime = self.runtime();
        if runtime.logs.len() >= self.max_logs {
            runtime.logs.pop_front();
        }
        runtime.logs.push_back(log);
    }

    pub fn clear_logs(&self) {
        self.runtime().logs.clear();
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let runtime = self.runtime();
        TaskSnapshot {
            id: self.key.clone(),
            project: self.id.project.clone(),
            name: self.id.name.clone(),
            command: self.descriptor.command.clone(),
            status: runtime.status,
            description: self.descriptor.description.clone(),
            icon: self.descriptor.icon.clone(),
            link: self.descriptor.link.clone(),
            default_view: self.descriptor.default_view.clone(),
            views: self.descriptor.views.clone(),
            need_history: self.descriptor.need_history,
            started_at: runtime.started_at,
            run_id: runtime.run_id.clone(),
        }
    }
}

/// All known tasks, grouped by project. Only insertion and lookup.
#[derive(Debug)]
pub struct TaskRegistry {
    projects: RwLock<HashMap<String, Vec<Arc<TaskEntry>>>>,
    max_logs: usize,
}

impl TaskRegistry {
    pub fn new(max_logs: usize) -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            max_logs,
        }
    }

    /// Tasks of a project, if the project was loaded
    pub fn list(&self, project_id: &str) -> Option<Vec<Arc<TaskEntry>>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        projects.get(project_id).cloned()
    }

    /// Tasks of a project, registering `descriptors()` on first access
    pub fn load<F>(&self, project: &Project, descriptors: F) -> Vec<Arc<TaskEntry>>
    where
        F: FnOnce() -> Vec<TaskDescriptor>,
    {
        if let Some(tasks) = self.list(&project.id) {
            return tasks;
        }
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        projects
            .entry(project.id.clone())
            .or_insert_with(|| {
                let tasks: Vec<_> = descriptors()
                    .into_iter()
                    .map(|d| Arc::new(TaskEntry::new(project, d, self.max_logs)))
                    .collect();
                debug!(project = %project.id, count = tasks.len(), "tasks registered");
                tasks
            })
            .clone()
    }

    /// Find a task by "project:name" among loaded projects
    pub fn find(&self, task_id: &str) -> Option<Arc<TaskEntry>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        projects
            .values()
            .flat_map(|tasks| tasks.iter())
            .find(|t| t.key() == task_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskLogKind;

    fn project() -> Project {
        Project::new("web", "/srv/web")
    }

    #[test]
    fn test_load_registers_once() {
        let registry = TaskRegistry::new(10);
        let first = registry.load(&project(), || vec![TaskDescriptor::new("build", "make")]);
        let second = registry.load(&project(), || vec![TaskDescriptor::new("other", "true")]);

        assert_eq!(first.len(), 1);
        assert_eq!(second[0].key(), "web:build");
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn test_find_unknown() {
        let registry = TaskRegistry::new(10);
        assert!(registry.find("web:build").is_none());
        registry.load(&project(), || vec![TaskDescriptor::new("build", "make")]);
        assert!(registry.find("web:build").is_some());
        assert!(registry.list("api").is_none());
    }

    #[test]
    fn test_log_ring_evicts_oldest() {
        let entry = TaskEntry::new(&project(), TaskDescriptor::new("build", "make"), 3);
        for i in 0..5 {
            entry.push_log(TaskLog::new("web:build", TaskLogKind::Stdout, i.to_string()));
        }
        let texts: Vec<_> = entry.logs().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["2", "3", "4"]);

        entry.clear_logs();
        assert!(entry.logs().is_empty());
    }

    #[test]
    fn test_snapshot_defaults() {
        let entry = TaskEntry::new(
            &project(),
            TaskDescriptor::new("deploy", "ewan beta").with_need_history(true),
            10,
        );
        let snapshot = entry.snapshot();
        assert_eq!(snapshot.id, "web:deploy");
        assert_eq!(snapshot.status, TaskStatus::Idle);
        assert!(snapshot.need_history);
        assert!(snapshot.started_at.is_none());
    }
}
