//! Wiring shared by the commands: configuration and the task manager

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use taskdeck_core::config::default_store_path;
use taskdeck_core::{load_config_or_default, Config, ProjectRegistry};
use taskdeck_git::GitConnector;
use taskdeck_tasks::{JsonFileStore, MemoryStore, TaskManager, TaskStore};

/// Configuration found from the working directory, or the defaults
pub fn load_config() -> anyhow::Result<(Config, Option<PathBuf>)> {
    let cwd = std::env::current_dir()?;
    Ok(load_config_or_default(&cwd))
}

/// Where the task database lives for `config`
pub fn store_path(config: &Config) -> Option<PathBuf> {
    config.history.store_path.clone().or_else(default_store_path)
}

/// Build the task manager for a configuration
pub fn task_manager(config: &Config) -> anyhow::Result<TaskManager> {
    let store: Arc<dyn TaskStore> = match store_path(config) {
        Some(path) => {
            debug!(path = %path.display(), "using task database");
            Arc::new(JsonFileStore::new(path))
        }
        None => {
            warn!("no home directory, task data will not be persisted");
            Arc::new(MemoryStore::new())
        }
    };

    let manager = TaskManager::builder()
        .config(config)
        .context("Invalid task configuration")?
        .store(store)
        .source_control(Arc::new(GitConnector::new()))
        .build();
    Ok(manager)
}

/// Project id given on the command line, or the first configured project
pub fn project_id(config: &Config, explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    taskdeck_core::ConfigProjects::from_config(config)
        .current()
        .map(|p| p.id)
        .context("No project configured. Add one to taskdeck.yaml or pass a project id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::config::ProjectConfig;

    fn config() -> Config {
        Config {
            projects: vec![ProjectConfig {
                id: "web".to_string(),
                name: None,
                path: PathBuf::from("/srv/web"),
                repo: None,
                tasks: Vec::new(),
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_project_id_defaults_to_first() {
        assert_eq!(project_id(&config(), None).unwrap(), "web");
        assert_eq!(project_id(&config(), Some("api")).unwrap(), "api");
        assert!(project_id(&Config::default(), None).is_err());
    }

    #[test]
    fn test_store_path_prefers_config() {
        let mut config = config();
        config.history.store_path = Some(PathBuf::from("/tmp/db.json"));
        assert_eq!(store_path(&config), Some(PathBuf::from("/tmp/db.json")));
    }
}
