//! taskdeck core - shared foundation for the task engine
//!
//! This crate provides error handling, configuration, the project registry
//! and the collaborator contracts used by the prompt and task crates.

pub mod config;
pub mod error;
pub mod project;
pub mod scm;
pub mod types;

pub use config::{load_config_or_default, Config};
pub use error::{ConfigError, GitError, HookError, Result, StoreError, TaskdeckError};
pub use project::{ConfigProjects, ProjectRegistry};
pub use scm::SourceControl;
pub use types::{Branch, Project};
