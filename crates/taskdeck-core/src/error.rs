//! Error types for taskdeck

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TaskdeckError
pub type Result<T> = std::result::Result<T, TaskdeckError>;

/// Main error type for taskdeck operations
#[derive(Debug, Error)]
pub enum TaskdeckError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Source-control errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Persistence errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Extension hook errors
    #[error(transparent)]
    Hook(#[from] HookError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Source-control errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// `git pull` (or equivalent) failed
    #[error("Failed to pull in {dir}: {reason}")]
    PullFailed { dir: PathBuf, reason: String },

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// IO error while invoking the git binary
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors raised by task stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not valid JSON
    #[error("Store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Lock poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Errors raised by task extension hooks
#[derive(Debug, Error)]
pub enum HookError {
    /// A hook ran but reported failure
    #[error("Hook '{hook}' failed for task {task}: {message}")]
    Failed {
        hook: String,
        task: String,
        message: String,
    },

    /// A command started by a hook could not be executed
    #[error("Hook command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },
}

impl TaskdeckError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

impl HookError {
    /// Shorthand for a failed hook
    pub fn failed(
        hook: impl Into<String>,
        task: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Failed {
            hook: hook.into(),
            task: task.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "tasks.max_logs".to_string(),
            message: "must be greater than 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tasks.max_logs - must be greater than 0"
        );
    }

    #[test]
    fn test_hook_error_converts() {
        let err: TaskdeckError = HookError::failed("on_exit", "web:build", "boom").into();
        assert!(matches!(err, TaskdeckError::Hook(_)));
        assert!(err.to_string().contains("web:build"));
    }
}
