//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for taskdeck
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Task execution configuration
    pub tasks: TasksConfig,

    /// Run history configuration
    pub history: HistoryConfig,

    /// Registered projects
    pub projects: Vec<ProjectConfig>,
}

impl Config {
    /// Resolve relative project and store paths against `base`
    /// (usually the directory holding the config file).
    pub fn resolve_paths(&mut self, base: &Path) {
        for project in &mut self.projects {
            if project.path.is_relative() {
                project.path = base.join(&project.path);
            }
        }
        if let Some(store) = &self.history.store_path {
            if store.is_relative() {
                self.history.store_path = Some(base.join(store));
            }
        }
    }

    /// Look up a project by id
    pub fn project(&self, id: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.id == id)
    }
}

/// Task execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Capacity of each task's log ring buffer
    pub max_logs: usize,

    /// View the task badges are attached to
    pub view_id: String,

    /// Build-mode variable withheld from spawned commands
    pub build_mode_env: Option<String>,

    /// Window (ms) in which a "not found" spawn error counts as a terminated run.
    /// Only consulted on Windows.
    pub spawn_error_grace_ms: u64,

    /// How long the terminator waits after the graceful signal before killing (ms)
    pub terminate_timeout_ms: u64,

    /// Chunks per log batch before a forced flush
    pub log_batch_size: usize,

    /// Maximum delay (ms) before buffered output is delivered
    pub log_batch_interval_ms: u64,

    /// How long to wait for output readers to drain after exit (ms)
    pub drain_timeout_ms: u64,

    /// Whether to pull from source control before each run
    pub pull_before_run: bool,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_logs: 2000,
            view_id: "taskdeck-project-tasks".to_string(),
            build_mode_env: Some("NODE_ENV".to_string()),
            spawn_error_grace_ms: 500,
            terminate_timeout_ms: 3000,
            log_batch_size: 50,
            log_batch_interval_ms: 300,
            drain_timeout_ms: 250,
            pull_before_run: true,
        }
    }
}

/// Run history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Records kept per task
    pub max_records: usize,

    /// Homepage template for a run, `{project}` and `{id}` are substituted
    pub homepage: Option<String>,

    /// JSON file holding persisted task data (default: ~/.taskdeck/db.json)
    pub store_path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: 10,
            homepage: None,
            store_path: None,
        }
    }
}

/// A project registered with the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Unique project id
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Working directory for the project's tasks
    pub path: PathBuf,

    /// Repository URL, if any
    #[serde(default)]
    pub repo: Option<String>,

    /// Tasks declared for the project (built-in tasks are used when empty)
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// A task declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Task name, unique within the project
    pub name: String,

    /// Command template (program followed by arguments)
    pub command: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub default_view: Option<String>,

    /// Whether runs are recorded in the persisted history
    #[serde(default)]
    pub need_history: bool,

    #[serde(default)]
    pub views: Vec<ViewConfig>,

    /// Parameters resolved before each run
    #[serde(default)]
    pub prompts: Vec<PromptConfig>,
}

/// A view attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub id: String,
    pub label: String,
    pub component: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A prompt declared in configuration. Only constant hooks can be expressed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Prompt id (dotted paths address nested answers)
    pub name: String,

    /// Prompt kind (input, number, confirm, list, rawlist, expand, checkbox, password, editor)
    #[serde(rename = "type", default = "default_prompt_kind")]
    pub kind: String,

    #[serde(default)]
    pub message: Option<String>,

    /// Short display name
    #[serde(default)]
    pub short: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub tab_id: Option<String>,

    /// Default value
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    /// Explicit value, takes precedence over `default`
    #[serde(default)]
    pub value: Option<serde_json::Value>,

    /// Initial state of confirm prompts
    #[serde(default)]
    pub checked: bool,

    /// Static visibility
    #[serde(default)]
    pub when: Option<bool>,

    #[serde(default)]
    pub choices: Option<Vec<ChoiceConfig>>,
}

fn default_prompt_kind() -> String {
    "input".to_string()
}

/// A static choice of a list/checkbox prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub value: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub disabled: bool,
}
