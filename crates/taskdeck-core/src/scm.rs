//! Source-control connector contract

use std::path::Path;

use async_trait::async_trait;

use crate::error::GitError;
use crate::types::{Branch, Project};

/// Operations the task engine needs from version control
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Update the working copy at `dir`, from `repo` when given, else its upstream
    async fn pull(&self, repo: Option<&str>, dir: &Path) -> Result<(), GitError>;

    /// List the project's branches
    async fn branches(&self, project: &Project) -> Result<Vec<Branch>, GitError>;
}
