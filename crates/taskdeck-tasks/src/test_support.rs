//! Test doubles for the task engine's collaborators

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use taskdeck_core::config::{HistoryConfig, TasksConfig};
use taskdeck_core::{Branch, ConfigProjects, GitError, Project, Result, SourceControl};

use crate::manager::{Shared, TaskManager};
use crate::notify::{Badge, BadgeNotifier, DesktopNotifier, Notification};
use crate::registry::TaskEntry;
use crate::reporter::{CollectingReporter, TaskEvent};
use crate::store::MemoryStore;
use crate::task::TaskDescriptor;
use crate::terminate::{ProcessHandle, ProcessTerminator, TerminateOutcome, Terminator};

/// Records badge changes as "+id" / "-id" and every notification
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    badges: Mutex<Vec<String>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn badges(&self) -> Vec<String> {
        self.badges.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl BadgeNotifier for RecordingNotifier {
    fn add_badge(&self, _view_id: &str, badge: Badge) -> Result<()> {
        self.badges.lock().unwrap().push(format!("+{}", badge.id));
        Ok(())
    }

    fn remove_badge(&self, _view_id: &str, badge_id: &str) -> Result<()> {
        self.badges.lock().unwrap().push(format!("-{}", badge_id));
        Ok(())
    }
}

impl DesktopNotifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Real process termination with a call counter and an optional forced failure
pub(crate) struct ScriptedTerminator {
    inner: ProcessTerminator,
    calls: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl ScriptedTerminator {
    fn new() -> Self {
        Self {
            inner: ProcessTerminator::new(Duration::from_secs(2)),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Terminator for ScriptedTerminator {
    async fn terminate(&self, process: &ProcessHandle, cwd: &Path) -> TerminateOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(reason) => TerminateOutcome::Failed(reason),
            None => self.inner.terminate(process, cwd).await,
        }
    }
}

/// Source control with one current branch and a switchable pull failure
#[derive(Debug, Default)]
pub(crate) struct FakeScm {
    pull_error: Mutex<Option<String>>,
}

impl FakeScm {
    pub fn fail_pull(&self, reason: &str) {
        *self.pull_error.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl SourceControl for FakeScm {
    async fn pull(&self, _repo: Option<&str>, dir: &Path) -> std::result::Result<(), GitError> {
        match self.pull_error.lock().unwrap().clone() {
            Some(reason) => Err(GitError::PullFailed {
                dir: dir.to_path_buf(),
                reason,
            }),
            None => Ok(()),
        }
    }

    async fn branches(&self, _project: &Project) -> std::result::Result<Vec<Branch>, GitError> {
        Ok(vec![
            Branch {
                name: "develop".to_string(),
                current: false,
                commit: "0ff1ce0".to_string(),
                label: "Work in progress".to_string(),
            },
            Branch {
                name: "main".to_string(),
                current: true,
                commit: "abc123".to_string(),
                label: "Fix login".to_string(),
            },
        ])
    }
}

/// A manager wired to test doubles, with projects "web" and "bare" in a
/// temporary directory. Only "web" gets the declared tasks.
pub(crate) struct Harness {
    pub manager: TaskManager,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub terminator: Arc<ScriptedTerminator>,
    pub reporter: Arc<CollectingReporter>,
    pub scm: Arc<FakeScm>,
    dir: TempDir,
}

#[derive(Default)]
pub(crate) struct HarnessBuilder {
    tasks: Vec<TaskDescriptor>,
    tasks_config: TasksConfig,
    history_config: HistoryConfig,
    web_dir: Option<PathBuf>,
}

impl HarnessBuilder {
    pub fn tasks(mut self, tasks: Vec<TaskDescriptor>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn tasks_config(mut self, config: TasksConfig) -> Self {
        self.tasks_config = config;
        self
    }

    pub fn history_config(mut self, config: HistoryConfig) -> Self {
        self.history_config = config;
        self
    }

    /// Put project "web" somewhere other than the temp dir
    pub fn web_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.web_dir = Some(path.into());
        self
    }

    pub fn build(self) -> Harness {
        let dir = TempDir::new().unwrap();
        let projects = ConfigProjects::new(vec![
            Project::new("web", self.web_dir.as_deref().unwrap_or(dir.path())),
            Project::new("bare", dir.path()),
        ]);
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let terminator = Arc::new(ScriptedTerminator::new());
        let reporter = Arc::new(CollectingReporter::default());
        let scm = Arc::new(FakeScm::default());

        let mut builder = TaskManager::builder()
            .tasks_config(self.tasks_config)
            .history_config(self.history_config)
            .projects(Arc::new(projects))
            .store(store.clone())
            .source_control(scm.clone())
            .terminator(terminator.clone())
            .badges(notifier.clone())
            .notifier(notifier.clone())
            .reporter(reporter.clone());
        if !self.tasks.is_empty() {
            builder = builder.project_tasks("web", self.tasks);
        }

        Harness {
            manager: builder.build(),
            store,
            notifier,
            terminator,
            reporter,
            scm,
            dir,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_tasks(tasks: Vec<TaskDescriptor>) -> Self {
        Self::builder().tasks(tasks).build()
    }

    pub fn shared(&self) -> Arc<Shared> {
        self.manager.shared().clone()
    }

    /// A standalone entry of project "web", outside the registry
    pub fn entry(&self, descriptor: TaskDescriptor) -> Arc<TaskEntry> {
        let project = Project::new("web", self.dir.path());
        Arc::new(TaskEntry::new(&project, descriptor, 100))
    }

    /// Wait until `count` runs have been fully processed
    pub async fn wait_exits(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let exits = self
                    .reporter
                    .events()
                    .iter()
                    .filter(|e| matches!(e, TaskEvent::Exit { .. }))
                    .count();
                if exits >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task did not exit in time");
    }
}
