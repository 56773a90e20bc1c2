//! Core types shared by the taskdeck crates

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;

/// A project known to the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project id
    pub id: String,
    /// Display name
    pub name: String,
    /// Working directory of the project's tasks
    pub path: PathBuf,
    /// Repository URL used by the source-control connector
    pub repo: Option<String>,
}

impl Project {
    /// Create a project rooted at `path`
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            path: path.into(),
            repo: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the repository URL
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }
}

impl From<&ProjectConfig> for Project {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            path: config.path.clone(),
            repo: config.repo.clone(),
        }
    }
}

/// A branch as reported by the source-control connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name
    pub name: String,
    /// Whether HEAD points at this branch
    pub current: bool,
    /// Short commit hash of the branch tip
    pub commit: String,
    /// Summary line of the tip commit
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_from_config_defaults_name() {
        let config = ProjectConfig {
            id: "web".to_string(),
            name: None,
            path: PathBuf::from("/srv/web"),
            repo: Some("git@example.com:web.git".to_string()),
            tasks: Vec::new(),
        };
        let project = Project::from(&config);
        assert_eq!(project.name, "web");
        assert_eq!(project.repo.as_deref(), Some("git@example.com:web.git"));
    }

    #[test]
    fn test_project_builder() {
        let project = Project::new("api", "/srv/api").with_name("API");
        assert_eq!(project.id, "api");
        assert_eq!(project.name, "API");
        assert!(project.repo.is_none());
    }
}
