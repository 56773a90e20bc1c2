//! Task types and definitions

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskdeck_core::config::{TaskConfig, ViewConfig};
use taskdeck_core::ConfigError;
use taskdeck_prompts::PromptDefinition;

use crate::extension::TaskExtension;

/// Unique identifier for a task across projects
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskId {
    /// Owning project id
    pub project: String,
    /// Task name (e.g., "build", "deploy-beta")
    pub name: String,
}

impl TaskId {
    /// Create a new task ID
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }

    /// Parse a task ID from "project:task" format
    pub fn parse(s: &str) -> Option<Self> {
        let (project, name) = s.split_once(':')?;
        if project.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(project, name))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.name)
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Never run since the host started
    #[default]
    Idle,
    Running,
    /// Last run exited with code 0
    Done,
    /// Last run failed
    Error,
    /// Last run was stopped or killed
    Terminated,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Terminated => "terminated",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream a log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLogKind {
    Stdout,
    Stderr,
    Info,
    Error,
}

/// One delivered log entry of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskLogKind,
    pub text: String,
}

impl TaskLog {
    pub fn new(task_id: impl Into<String>, kind: TaskLogKind, text: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            text: text.into(),
        }
    }
}

/// A dashboard view attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    pub label: String,
    pub component: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl From<&ViewConfig> for TaskView {
    fn from(config: &ViewConfig) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            component: config.component.clone(),
            icon: config.icon.clone(),
        }
    }
}

/// Declaration of a task: what to run and how it is presented
#[derive(Clone)]
pub struct TaskDescriptor {
    /// Task name, unique within the project
    pub name: String,
    /// Command template: program followed by arguments
    pub command: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub default_view: Option<String>,
    /// Whether runs are recorded in the persisted history
    pub need_history: bool,
    pub views: Vec<TaskView>,
    /// Parameters resolved before each run
    pub prompts: Vec<PromptDefinition>,
    /// Lifecycle hooks
    pub extension: Option<Arc<dyn TaskExtension>>,
}

impl TaskDescriptor {
    /// Create a new task descriptor
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            description: None,
            icon: None,
            link: None,
            default_view: None,
            need_history: false,
            views: Vec::new(),
            prompts: Vec::new(),
            extension: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = Some(view.into());
        self
    }

    pub fn with_need_history(mut self, need_history: bool) -> Self {
        self.need_history = need_history;
        self
    }

    /// Append a prompt
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Attach lifecycle hooks
    pub fn with_extension(mut self, extension: impl TaskExtension + 'static) -> Self {
        self.extension = Some(Arc::new(extension));
        self
    }

    /// Build a descriptor from configuration
    pub fn from_config(config: &TaskConfig) -> Result<Self, ConfigError> {
        let prompts = config
            .prompts
            .iter()
            .map(|p| {
                PromptDefinition::try_from(p).map_err(|message| ConfigError::InvalidValue {
                    field: format!("tasks.{}.prompts.{}", config.name, p.name),
                    message,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: config.name.clone(),
            command: config.command.clone(),
            description: config.description.clone(),
            icon: config.icon.clone(),
            link: config.link.clone(),
            default_view: config.default_view.clone(),
            need_history: config.need_history,
            views: config.views.iter().map(TaskView::from).collect(),
            prompts,
            extension: None,
        })
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("need_history", &self.need_history)
            .field("prompts", &self.prompts.len())
            .field("extension", &self.extension.is_some())
            .finish()
    }
}

/// Point-in-time view of a task, as published to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// "project:name"
    pub id: String,
    pub project: String,
    pub name: String,
    pub command: String,
    pub status: TaskStatus,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub default_view: Option<String>,
    pub views: Vec<TaskView>,
    pub need_history: bool,
    /// Wall-clock start of the latest run
    pub started_at: Option<DateTime<Utc>>,
    /// Id of the latest run
    pub run_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        let id = TaskId::new("web", "build");
        assert_eq!(id.to_string(), "web:build");
    }

    #[test]
    fn test_task_id_parse() {
        let id = TaskId::parse("web:deploy-beta").unwrap();
        assert_eq!(id.project, "web");
        assert_eq!(id.name, "deploy-beta");
    }

    #[test]
    fn test_task_id_parse_invalid() {
        assert!(TaskId::parse("nobuild").is_none());
        assert!(TaskId::parse(":build").is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Terminated).unwrap(),
            "\"terminated\""
        );
        assert_eq!(TaskStatus::default(), TaskStatus::Idle);
    }

    #[test]
    fn test_descriptor_from_config() {
        let config: TaskConfig = task_config(
            r#"{
                "name": "build",
                "command": "npm run build",
                "need_history": true,
                "views": [{"id": "dash", "label": "Dashboard", "component": "dashboard"}],
                "prompts": [{"name": "mode", "type": "list", "default": "production"}]
            }"#,
        );
        let descriptor = TaskDescriptor::from_config(&config).unwrap();
        assert!(descriptor.need_history);
        assert_eq!(descriptor.views[0].label, "Dashboard");
        assert_eq!(descriptor.prompts[0].name, "mode");
        assert!(descriptor.extension.is_none());
    }

    #[test]
    fn test_descriptor_rejects_unknown_prompt_kind() {
        let config: TaskConfig = task_config(
            r#"{"name": "build", "command": "make", "prompts": [{"name": "x", "type": "slider"}]}"#,
        );
        let err = TaskDescriptor::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("tasks.build.prompts.x"));
    }

    fn task_config(json: &str) -> TaskConfig {
        serde_json::from_str(json).unwrap()
    }
}
