//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, PromptConfig};

/// Prompt kinds accepted in configuration files
pub const PROMPT_KINDS: &[&str] = &[
    "input", "number", "confirm", "list", "rawlist", "expand", "checkbox", "password", "editor",
];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_tasks(config)?;
    validate_history(config)?;
    validate_projects(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> crate::error::TaskdeckError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
    .into()
}

fn validate_tasks(config: &Config) -> Result<()> {
    if config.tasks.max_logs == 0 {
        return Err(invalid("tasks.max_logs", "must be greater than 0"));
    }
    if config.tasks.log_batch_size == 0 {
        return Err(invalid("tasks.log_batch_size", "must be greater than 0"));
    }
    if config.tasks.log_batch_interval_ms == 0 {
        return Err(invalid("tasks.log_batch_interval_ms", "must be greater than 0"));
    }
    if config.tasks.view_id.is_empty() {
        return Err(invalid("tasks.view_id", "view id cannot be empty"));
    }
    Ok(())
}

fn validate_history(config: &Config) -> Result<()> {
    if config.history.max_records == 0 {
        return Err(invalid("history.max_records", "must be greater than 0"));
    }
    Ok(())
}

fn validate_projects(config: &Config) -> Result<()> {
    let mut ids = HashSet::new();
    for (i, project) in config.projects.iter().enumerate() {
        if project.id.is_empty() || project.id.contains(':') {
            return Err(invalid(
                format!("projects[{}].id", i),
                "project id must be non-empty and cannot contain ':'",
            ));
        }
        if !ids.insert(project.id.as_str()) {
            return Err(invalid(
                format!("projects[{}].id", i),
                format!("duplicate project id '{}'", project.id),
            ));
        }

        let mut names = HashSet::new();
        for (j, task) in project.tasks.iter().enumerate() {
            let field = format!("projects[{}].tasks[{}]", i, j);
            if task.name.is_empty() {
                return Err(invalid(format!("{}.name", field), "task name cannot be empty"));
            }
            if !names.insert(task.name.as_str()) {
                return Err(invalid(
                    format!("{}.name", field),
                    format!("duplicate task name '{}'", task.name),
                ));
            }
            if task.command.trim().is_empty() {
                return Err(invalid(format!("{}.command", field), "command cannot be empty"));
            }
            validate_prompts(&field, &task.prompts)?;
        }
    }
    Ok(())
}

fn validate_prompts(field: &str, prompts: &[PromptConfig]) -> Result<()> {
    let mut names = HashSet::new();
    for (k, prompt) in prompts.iter().enumerate() {
        let field = format!("{}.prompts[{}]", field, k);
        if prompt.name.is_empty() {
            return Err(invalid(format!("{}.name", field), "prompt name cannot be empty"));
        }
        if !names.insert(prompt.name.as_str()) {
            return Err(invalid(
                format!("{}.name", field),
                format!("duplicate prompt name '{}'", prompt.name),
            ));
        }
        if !PROMPT_KINDS.contains(&prompt.kind.as_str()) {
            return Err(invalid(
                format!("{}.type", field),
                format!("must be one of: {}", PROMPT_KINDS.join(", ")),
            ));
        }
    }
    Ok(())
}
