//! Project registry

use std::sync::RwLock;

use tracing::debug;

use crate::config::Config;
use crate::types::Project;

/// Lookup of projects by id
pub trait ProjectRegistry: Send + Sync {
    /// Find a project by id
    fn find(&self, id: &str) -> Option<Project>;

    /// The project currently opened in the dashboard, if any
    fn current(&self) -> Option<Project>;

    /// All known projects
    fn all(&self) -> Vec<Project>;
}

/// Registry backed by the `projects` section of the configuration
#[derive(Debug, Default)]
pub struct ConfigProjects {
    projects: Vec<Project>,
    current: RwLock<Option<String>>,
}

impl ConfigProjects {
    /// Build the registry from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.projects.iter().map(Project::from).collect())
    }

    /// Build the registry from explicit projects
    pub fn new(projects: Vec<Project>) -> Self {
        let current = projects.first().map(|p| p.id.clone());
        Self {
            projects,
            current: RwLock::new(current),
        }
    }

    /// Mark a project as the current one. Unknown ids are ignored.
    pub fn set_current(&self, id: &str) -> bool {
        if self.projects.iter().all(|p| p.id != id) {
            debug!(project = id, "ignoring unknown current project");
            return false;
        }
        if let Ok(mut current) = self.current.write() {
            *current = Some(id.to_string());
            return true;
        }
        false
    }
}

impl ProjectRegistry for ConfigProjects {
    fn find(&self, id: &str) -> Option<Project> {
        self.projects.iter().find(|p| p.id == id).cloned()
    }

    fn current(&self) -> Option<Project> {
        let id = self.current.read().ok()?.clone()?;
        self.find(&id)
    }

    fn all(&self) -> Vec<Project> {
        self.projects.clone()
    }
}
