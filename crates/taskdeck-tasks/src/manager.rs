//! Task manager: the transport-facing facade over the registry, the prompt
//! engine and the runner

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use taskdeck_core::config::{HistoryConfig, TasksConfig};
use taskdeck_core::{Config, ConfigError, ConfigProjects, ProjectRegistry, SourceControl};
use taskdeck_prompts::{Answers, PromptEngine, PromptState};

use crate::builtin::default_tasks;
use crate::events::{self, ConsoleLog, ConsoleLogKind, EventBus, ServerEvent, Subscription};
use crate::history::{HistoryRecord, HistoryStore};
use crate::notify::{BadgeNotifier, DesktopNotifier, Notification, TracingNotifier};
use crate::registry::{TaskEntry, TaskRegistry};
use crate::reporter::{TaskEvent, TaskReporter, TaskReporterRegistry};
use crate::runner;
use crate::store::{MemoryStore, TaskStore};
use crate::task::{TaskDescriptor, TaskId, TaskLog, TaskLogKind, TaskSnapshot};
use crate::terminate::{ProcessTerminator, Terminator};

/// State shared by the manager, the runner and every task hook
pub(crate) struct Shared {
    pub config: TasksConfig,
    pub registry: TaskRegistry,
    pub projects: Arc<dyn ProjectRegistry>,
    pub prompts: Arc<PromptEngine>,
    pub history: HistoryStore,
    pub scm: Option<Arc<dyn SourceControl>>,
    pub terminator: Arc<dyn Terminator>,
    pub badges: Arc<dyn BadgeNotifier>,
    pub notifier: Arc<dyn DesktopNotifier>,
    pub reporters: TaskReporterRegistry,
    pub events: EventBus,
    pub project_tasks: HashMap<String, Vec<TaskDescriptor>>,
}

impl Shared {
    /// Append a log line to a task and publish it
    pub fn add_log(&self, entry: &TaskEntry, kind: TaskLogKind, text: impl Into<String>) {
        let log = TaskLog::new(entry.key(), kind, text);
        entry.push_log(log.clone());
        self.events.publish(ServerEvent::TaskLogAdded(log));
    }

    pub fn console(&self, message: impl Into<String>, kind: ConsoleLogKind) {
        self.events
            .publish(ServerEvent::ConsoleLog(ConsoleLog::new(message, kind)));
    }

    pub fn notify(&self, notification: &Notification) {
        if let Err(e) = self.notifier.notify(notification) {
            warn!(title = %notification.title, error = %e, "failed to show notification");
        }
    }

    fn descriptors(&self, project_id: &str) -> Vec<TaskDescriptor> {
        match self.project_tasks.get(project_id) {
            Some(tasks) if !tasks.is_empty() => tasks.clone(),
            _ => default_tasks(),
        }
    }

    /// Entry of a task, registering its project's tasks on first access
    pub fn entry(&self, task_id: &str) -> Option<Arc<TaskEntry>> {
        if let Some(entry) = self.registry.find(task_id) {
            return Some(entry);
        }
        let id = TaskId::parse(task_id)?;
        let project = self.projects.find(&id.project)?;
        self.registry
            .load(&project, || self.descriptors(&project.id))
            .into_iter()
            .find(|t| t.id().name == id.name)
    }

    /// Fresh prompt set for a task, seeded with its saved answers
    pub async fn restore_prompts(&self, entry: &TaskEntry) -> Vec<PromptState> {
        let key = entry.key();
        self.prompts.reset(key).await;
        for prompt in &entry.descriptor().prompts {
            self.prompts.add(key, prompt.clone()).await;
        }
        match self.history.saved_answers(key).await {
            Ok(Some(answers)) => {
                self.prompts.set_answers(key, answers).await;
            }
            Ok(None) => {}
            Err(e) => warn!(task = key, error = %e, "failed to read saved parameters"),
        }
        self.prompts.start(key).await
    }

    /// Make sure the task's prompt set exists
    pub async fn ensure_prompts(&self, entry: &TaskEntry) -> Vec<PromptState> {
        match self.prompts.list(entry.key()).await {
            Some(prompts) if !prompts.is_empty() || entry.descriptor().prompts.is_empty() => {
                prompts
            }
            _ => self.restore_prompts(entry).await,
        }
    }
}

/// Builder for [`TaskManager`]
pub struct TaskManagerBuilder {
    tasks: TasksConfig,
    history: HistoryConfig,
    projects: Option<Arc<dyn ProjectRegistry>>,
    store: Option<Arc<dyn TaskStore>>,
    scm: Option<Arc<dyn SourceControl>>,
    terminator: Option<Arc<dyn Terminator>>,
    badges: Option<Arc<dyn BadgeNotifier>>,
    notifier: Option<Arc<dyn DesktopNotifier>>,
    reporters: TaskReporterRegistry,
    project_tasks: HashMap<String, Vec<TaskDescriptor>>,
}

impl TaskManagerBuilder {
    fn new() -> Self {
        Self {
            tasks: TasksConfig::default(),
            history: HistoryConfig::default(),
            projects: None,
            store: None,
            scm: None,
            terminator: None,
            badges: None,
            notifier: None,
            reporters: TaskReporterRegistry::new(),
            project_tasks: HashMap::new(),
        }
    }

    /// Take settings, projects and declared tasks from a loaded configuration
    pub fn config(mut self, config: &Config) -> Result<Self, ConfigError> {
        self.tasks = config.tasks.clone();
        self.history = config.history.clone();
        self.projects = Some(Arc::new(ConfigProjects::from_config(config)));
        for project in &config.projects {
            if project.tasks.is_empty() {
                continue;
            }
            let tasks = project
                .tasks
                .iter()
                .map(TaskDescriptor::from_config)
                .collect::<Result<Vec<_>, _>>()?;
            self.project_tasks.insert(project.id.clone(), tasks);
        }
        Ok(self)
    }

    pub fn tasks_config(mut self, config: TasksConfig) -> Self {
        self.tasks = config;
        self
    }

    pub fn history_config(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }

    pub fn projects(mut self, projects: Arc<dyn ProjectRegistry>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn source_control(mut self, scm: Arc<dyn SourceControl>) -> Self {
        self.scm = Some(scm);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn badges(mut self, badges: Arc<dyn BadgeNotifier>) -> Self {
        self.badges = Some(badges);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn DesktopNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Add a lifecycle listener
    pub fn reporter(mut self, reporter: Arc<dyn TaskReporter>) -> Self {
        self.reporters.register_shared(reporter);
        self
    }

    /// Declare the tasks of a project, replacing the built-in ones
    pub fn project_tasks(mut self, project_id: impl Into<String>, tasks: Vec<TaskDescriptor>) -> Self {
        self.project_tasks.insert(project_id.into(), tasks);
        self
    }

    pub fn build(self) -> TaskManager {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let terminator = self.terminator.unwrap_or_else(|| {
            Arc::new(ProcessTerminator::new(Duration::from_millis(
                self.tasks.terminate_timeout_ms,
            )))
        });
        let shared = Shared {
            registry: TaskRegistry::new(self.tasks.max_logs),
            projects: self
                .projects
                .unwrap_or_else(|| Arc::new(ConfigProjects::default())),
            prompts: Arc::new(PromptEngine::new()),
            history: HistoryStore::new(store, &self.history),
            scm: self.scm,
            terminator,
            badges: self.badges.unwrap_or_else(|| Arc::new(TracingNotifier)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            reporters: self.reporters,
            events: EventBus::new(),
            project_tasks: self.project_tasks,
            config: self.tasks,
        };
        TaskManager {
            shared: Arc::new(shared),
        }
    }
}

/// Entry point for clients: every operation takes plain ids and answers
/// `None`/`false` for unknown ones.
#[derive(Clone)]
pub struct TaskManager {
    shared: Arc<Shared>,
}

impl TaskManager {
    pub fn builder() -> TaskManagerBuilder {
        TaskManagerBuilder::new()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// The prompt engine holding every task's parameters
    pub fn prompts(&self) -> &PromptEngine {
        &self.shared.prompts
    }

    /// Tasks of a project, `None` for unknown projects
    #[instrument(skip(self))]
    pub fn tasks(&self, project_id: &str) -> Option<Vec<TaskSnapshot>> {
        let project = self.shared.projects.find(project_id)?;
        let tasks = self
            .shared
            .registry
            .load(&project, || self.shared.descriptors(&project.id));
        Some(tasks.iter().map(|t| t.snapshot()).collect())
    }

    pub fn task(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.shared.entry(task_id).map(|e| e.snapshot())
    }

    pub fn task_logs(&self, task_id: &str) -> Option<Vec<TaskLog>> {
        self.shared.entry(task_id).map(|e| e.logs())
    }

    /// Start a run. `label` becomes the run id; a timestamp is used without one.
    pub async fn task_run(&self, task_id: &str, label: Option<&str>) -> Option<TaskSnapshot> {
        let entry = self.shared.entry(task_id)?;
        runner::run(self.shared.clone(), entry.clone(), label.map(str::to_string)).await;
        Some(entry.snapshot())
    }

    pub async fn task_stop(&self, task_id: &str) -> Option<TaskSnapshot> {
        let entry = self.shared.entry(task_id)?;
        runner::stop(&self.shared, &entry).await;
        Some(entry.snapshot())
    }

    pub fn task_logs_clear(&self, task_id: &str) -> Option<TaskSnapshot> {
        let entry = self.shared.entry(task_id)?;
        entry.clear_logs();
        debug!(task = task_id, "logs cleared");
        Some(entry.snapshot())
    }

    /// Announce that a client opened the task
    pub fn task_open(&self, task_id: &str) -> bool {
        match self.shared.entry(task_id) {
            Some(entry) => {
                self.shared.reporters.broadcast(&TaskEvent::Open {
                    id: entry.id().clone(),
                });
                true
            }
            None => false,
        }
    }

    /// Prompts of a task, created from its saved parameters on first access
    pub async fn task_prompts(&self, task_id: &str) -> Option<Vec<PromptState>> {
        let entry = self.shared.entry(task_id)?;
        Some(self.shared.ensure_prompts(&entry).await)
    }

    /// Persist the task's current answers
    pub async fn task_save_parameters(&self, task_id: &str) -> Option<Answers> {
        let entry = self.shared.entry(task_id)?;
        let answers = self.shared.prompts.answers(entry.key()).await;
        if let Err(e) = self
            .shared
            .history
            .save_answers(entry.key(), answers.clone())
            .await
        {
            warn!(task = task_id, error = %e, "failed to save parameters");
        }
        Some(answers)
    }

    /// Rebuild the task's prompts from the saved answers
    pub async fn task_restore_parameters(&self, task_id: &str) -> Option<Vec<PromptState>> {
        let entry = self.shared.entry(task_id)?;
        Some(self.shared.restore_prompts(&entry).await)
    }

    /// Answer one prompt with the JSON text sent by a client
    pub async fn answer_prompt(
        &self,
        prompt_id: &str,
        task_id: &str,
        value: &str,
    ) -> Option<Vec<PromptState>> {
        let entry = self.shared.entry(task_id)?;
        self.shared.ensure_prompts(&entry).await;
        self.shared
            .prompts
            .answer_prompt(entry.key(), prompt_id, value)
            .await
    }

    /// Run history of a task, newest first
    pub async fn task_history(&self, task_id: &str) -> Option<Vec<HistoryRecord>> {
        let entry = self.shared.entry(task_id)?;
        match self
            .shared
            .history
            .list(entry.key(), &entry.id().project)
            .await
        {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(task = task_id, error = %e, "failed to read history");
                Some(Vec::new())
            }
        }
    }

    /// Homepage of a run in the current project
    pub fn history_homepage(&self, record: &HistoryRecord) -> String {
        let project = self
            .shared
            .projects
            .current()
            .map(|p| p.id)
            .unwrap_or_default();
        self.shared.history.homepage(&project, &record.id)
    }

    pub fn subscribe_task_changed(&self) -> Subscription<TaskSnapshot> {
        events::task_changed(&self.shared.events)
    }

    /// Log entries of one task
    pub fn subscribe_task_logs(&self, task_id: &str) -> Subscription<TaskLog> {
        events::task_logs(&self.shared.events, task_id)
    }

    pub fn subscribe_console(&self) -> Subscription<ConsoleLog> {
        events::console(&self.shared.events)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::extension::{BeforeRunContext, ExitContext, TaskExtension};
    use crate::task::TaskStatus;
    use crate::test_support::Harness;
    use async_trait::async_trait;
    use taskdeck_core::HookError;
    use taskdeck_prompts::{PromptDefinition, PromptKind};

    /// Holds the run in `on_before_run` for a while
    struct SlowStart;

    #[async_trait]
    impl TaskExtension for SlowStart {
        async fn on_before_run(&self, _ctx: &mut BeforeRunContext) -> Result<(), HookError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        }
    }

    struct BrokenHooks;

    #[async_trait]
    impl TaskExtension for BrokenHooks {
        async fn on_before_run(&self, ctx: &mut BeforeRunContext) -> Result<(), HookError> {
            Err(HookError::failed("on_before_run", &ctx.task_id, "boom"))
        }

        async fn on_exit(&self, ctx: &ExitContext) -> Result<(), HookError> {
            Err(HookError::failed("on_exit", &ctx.task_id, "boom"))
        }
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let harness = Harness::new();
        let manager = &harness.manager;

        assert!(manager.tasks("nope").is_none());
        assert!(manager.task("web:nope").is_none());
        assert!(manager.task("garbage").is_none());
        assert!(manager.task_run("nope:build", None).await.is_none());
        assert!(manager.task_stop("web:nope").await.is_none());
        assert!(manager.task_prompts("web:nope").await.is_none());
        assert!(manager.task_history("web:nope").await.is_none());
        assert!(!manager.task_open("web:nope"));
    }

    #[tokio::test]
    async fn test_builtin_tasks_when_none_declared() {
        let harness = Harness::new();
        let names: Vec<_> = harness
            .manager
            .tasks("bare")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(names, vec!["bare:deploy-beta", "bare:deploy-prod"]);
    }

    #[tokio::test]
    async fn test_successful_run() {
        let harness = Harness::with_tasks(vec![
            TaskDescriptor::new("hello", "printf 'hello\\n'").with_need_history(true),
        ]);
        let mut console = harness.manager.subscribe_console();

        let task = harness.manager.task_run("web:hello", Some("r1")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.run_id.as_deref(), Some("r1"));
        harness.wait_exits(1).await;

        assert_eq!(harness.manager.task("web:hello").unwrap().status, TaskStatus::Done);
        let logs = harness.manager.task_logs("web:hello").unwrap();
        let texts: Vec<_> = logs.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts[0], "$ printf 'hello\\n'");
        assert!(texts.contains(&"hello\n"));
        assert!(texts.last().unwrap().starts_with("Total task duration: "));

        assert_eq!(console.recv().await.unwrap().message, "Task web:hello started");
        assert_eq!(console.recv().await.unwrap().message, "Task web:hello completed");
        let notifications = harness.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Task completed");

        let history = harness.manager.task_history("web:hello").await.unwrap();
        assert_eq!(history[0].id, "r1");
        assert_eq!(history[0].status, Some(TaskStatus::Done));
    }

    #[tokio::test]
    async fn test_failed_run_notifies_once() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("fail", "exit 3")]);

        harness.manager.task_run("web:fail", None).await.unwrap();
        harness.wait_exits(1).await;

        assert_eq!(harness.manager.task("web:fail").unwrap().status, TaskStatus::Error);
        let notifications = harness.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Task error");
        assert_eq!(notifications[0].message, "Task web:fail ended with error code 3");
        assert_eq!(
            harness.notifier.badges(),
            vec!["+task-running", "+task-error", "-task-running"]
        );
    }

    #[tokio::test]
    async fn test_rerun_after_finish() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("quick", "true")]);

        harness.manager.task_run("web:quick", None).await.unwrap();
        harness.wait_exits(1).await;
        let task = harness.manager.task_run("web:quick", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        harness.wait_exits(2).await;

        assert_eq!(harness.manager.task("web:quick").unwrap().status, TaskStatus::Done);
        assert_eq!(harness.notifier.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_run_while_running_is_ignored() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("sleep", "sleep 30")]);

        harness.manager.task_run("web:sleep", None).await.unwrap();
        harness.manager.task_run("web:sleep", None).await.unwrap();
        let runs = harness
            .reporter
            .events()
            .iter()
            .filter(|e| matches!(e, TaskEvent::Run { .. }))
            .count();
        assert_eq!(runs, 1);

        harness.manager.task_stop("web:sleep").await.unwrap();
        harness.wait_exits(1).await;
    }

    #[tokio::test]
    async fn test_overlapping_runs_record_one_history_entry() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("slow", "true")
            .with_need_history(true)
            .with_extension(SlowStart)]);
        let manager = &harness.manager;

        let (first, second) = tokio::join!(
            manager.task_run("web:slow", Some("a")),
            manager.task_run("web:slow", Some("b"))
        );
        assert!(first.is_some() && second.is_some());
        harness.wait_exits(1).await;

        let runs = harness
            .reporter
            .events()
            .iter()
            .filter(|e| matches!(e, TaskEvent::Run { .. }))
            .count();
        assert_eq!(runs, 1);
        let history: Vec<_> = manager
            .task_history("web:slow")
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.id, r.status))
            .collect();
        assert_eq!(history, vec![("a".to_string(), Some(TaskStatus::Done))]);
    }

    #[tokio::test]
    async fn test_failing_hooks_do_not_block_exit() {
        let harness = Harness::with_tasks(vec![
            TaskDescriptor::new("hooked", "exit 2").with_extension(BrokenHooks)
        ]);

        harness.manager.task_run("web:hooked", None).await.unwrap();
        harness.wait_exits(1).await;

        assert_eq!(harness.manager.task("web:hooked").unwrap().status, TaskStatus::Error);
        let notifications = harness.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Task web:hooked ended with error code 2");
    }

    #[tokio::test]
    async fn test_spawn_error_marks_error() {
        let missing = tempfile::TempDir::new().unwrap().path().join("gone");
        let harness = Harness::builder()
            .tasks(vec![TaskDescriptor::new("x", "true")])
            .web_dir(&missing)
            .build();

        let task = harness.manager.task_run("web:x", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Error);

        let notifications = harness.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Task error");
        let logs = harness.manager.task_logs("web:x").unwrap();
        assert_eq!(logs[0].text, "$ true");
        let last = logs.last().unwrap();
        assert_eq!(last.kind, TaskLogKind::Error);
        assert!(last
            .text
            .starts_with("Error while running task web:x with message '"));
    }

    #[tokio::test]
    async fn test_background_output_dropped_after_drain() {
        let config = TasksConfig {
            drain_timeout_ms: 100,
            ..TasksConfig::default()
        };
        let harness = Harness::builder()
            .tasks(vec![TaskDescriptor::new(
                "bg",
                "(sleep 1; echo late) & echo early",
            )])
            .tasks_config(config)
            .build();

        harness.manager.task_run("web:bg", None).await.unwrap();
        harness.wait_exits(1).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let logs = harness.manager.task_logs("web:bg").unwrap();
        assert!(logs.iter().any(|l| l.text == "early\n"));
        assert!(!logs.iter().any(|l| l.text.contains("late")));
        assert!(logs.last().unwrap().text.starts_with("Total task duration: "));
    }

    #[tokio::test]
    async fn test_stop_marks_terminated_once() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("sleep", "sleep 30")]);
        let mut changes = harness.manager.subscribe_task_changed();

        harness.manager.task_run("web:sleep", None).await.unwrap();
        let task = harness.manager.task_stop("web:sleep").await.unwrap();
        assert_eq!(task.status, TaskStatus::Terminated);
        harness.wait_exits(1).await;

        assert_eq!(
            harness.manager.task("web:sleep").unwrap().status,
            TaskStatus::Terminated
        );
        assert!(harness.notifier.notifications().is_empty());
        assert_eq!(changes.recv().await.unwrap().status, TaskStatus::Running);
        assert_eq!(changes.recv().await.unwrap().status, TaskStatus::Terminated);
        assert_eq!(harness.terminator.calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_failure_keeps_running() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("nap", "sleep 1")]);
        harness.terminator.fail_with("permission denied");

        harness.manager.task_run("web:nap", None).await.unwrap();
        let task = harness.manager.task_stop("web:nap").await.unwrap();
        assert_eq!(task.status, TaskStatus::Running);

        harness.wait_exits(1).await;
        assert_eq!(harness.manager.task("web:nap").unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_stop_idle_task_is_noop() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("idle", "true")]);
        let task = harness.manager.task_stop("web:idle").await.unwrap();
        assert_eq!(task.status, TaskStatus::Idle);
        assert_eq!(harness.terminator.calls(), 0);
    }

    #[tokio::test]
    async fn test_pull_failure_is_logged() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("hello", "true")]);
        harness.scm.fail_pull("remote unreachable");

        harness.manager.task_run("web:hello", None).await.unwrap();
        harness.wait_exits(1).await;

        assert_eq!(harness.manager.task("web:hello").unwrap().status, TaskStatus::Done);
        let logs = harness.manager.task_logs("web:hello").unwrap();
        assert_eq!(logs[0].kind, TaskLogKind::Stdout);
        assert!(logs[0].text.contains("remote unreachable"));
    }

    #[tokio::test]
    async fn test_build_mode_variable_withheld() {
        std::env::set_var("TASKDECK_TEST_MODE", "development");
        let config = TasksConfig {
            build_mode_env: Some("TASKDECK_TEST_MODE".to_string()),
            ..TasksConfig::default()
        };
        let harness = Harness::builder()
            .tasks(vec![TaskDescriptor::new(
                "env",
                "echo \"mode=${TASKDECK_TEST_MODE:-unset} project=$TASKDECK_PROJECT_ID\"",
            )])
            .tasks_config(config)
            .build();

        harness.manager.task_run("web:env", None).await.unwrap();
        harness.wait_exits(1).await;

        let logs = harness.manager.task_logs("web:env").unwrap();
        assert!(logs.iter().any(|l| l.text == "mode=unset project=web\n"));
        assert_eq!(
            std::env::var("TASKDECK_TEST_MODE").as_deref(),
            Ok("development")
        );
    }

    #[tokio::test]
    async fn test_log_subscription_is_filtered() {
        let harness = Harness::with_tasks(vec![
            TaskDescriptor::new("one", "echo one"),
            TaskDescriptor::new("two", "echo two"),
        ]);
        let mut logs = harness.manager.subscribe_task_logs("web:two");

        harness.manager.task_run("web:one", None).await.unwrap();
        harness.manager.task_run("web:two", None).await.unwrap();
        harness.wait_exits(2).await;

        let first = logs.recv().await.unwrap();
        assert_eq!(first.task_id, "web:two");
        assert_eq!(first.text, "$ echo two");
    }

    #[tokio::test]
    async fn test_save_and_restore_parameters() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("greet", "echo")
            .with_prompt(PromptDefinition::new("name", PromptKind::Input).with_default("world"))]);
        let manager = &harness.manager;

        let prompts = manager.task_prompts("web:greet").await.unwrap();
        assert_eq!(prompts[0].raw_value, Some(serde_json::json!("world")));

        manager.answer_prompt("name", "web:greet", "\"ada\"").await.unwrap();
        let saved = manager.task_save_parameters("web:greet").await.unwrap();
        assert_eq!(saved.get("name"), Some(&serde_json::json!("ada")));

        manager.prompts().reset("web:greet").await;
        let restored = manager.task_restore_parameters("web:greet").await.unwrap();
        assert_eq!(restored[0].raw_value, Some(serde_json::json!("ada")));
    }

    #[tokio::test]
    async fn test_answer_prompt_invalid_json() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("greet", "echo")
            .with_prompt(PromptDefinition::new("name", PromptKind::Input))]);
        let prompts = harness
            .manager
            .answer_prompt("name", "web:greet", "{not json")
            .await
            .unwrap();
        assert_eq!(prompts[0].error.as_ref().unwrap().message, "Invalid input");
    }

    #[tokio::test]
    async fn test_logs_clear_and_open() {
        let harness = Harness::with_tasks(vec![TaskDescriptor::new("hello", "true")]);
        let entry = harness.shared().entry("web:hello").unwrap();
        harness
            .shared()
            .add_log(&entry, TaskLogKind::Info, "something");

        assert_eq!(harness.manager.task_logs("web:hello").unwrap().len(), 1);
        harness.manager.task_logs_clear("web:hello").unwrap();
        assert!(harness.manager.task_logs("web:hello").unwrap().is_empty());

        assert!(harness.manager.task_open("web:hello"));
        assert!(matches!(harness.reporter.events()[0], TaskEvent::Open { .. }));
    }

    #[tokio::test]
    async fn test_history_homepage_uses_template() {
        let history = HistoryConfig {
            homepage: Some("https://{project}.example.com/{id}".to_string()),
            ..HistoryConfig::default()
        };
        let harness = Harness::builder().history_config(history).build();

        let homepage = harness.manager.history_homepage(&HistoryRecord::new("r7"));
        assert_eq!(homepage, "https://web.example.com/r7");
    }
}
