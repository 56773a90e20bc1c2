//! `SourceControl` implementation backed by git

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use taskdeck_core::error::GitError;
use taskdeck_core::{Branch, Project, SourceControl};

use crate::repository::GitRepo;

/// Source-control connector for git working copies
#[derive(Debug, Clone)]
pub struct GitConnector {
    git_binary: String,
}

impl GitConnector {
    /// Create a connector using the `git` found on PATH
    pub fn new() -> Self {
        Self {
            git_binary: "git".to_string(),
        }
    }

    /// Use a specific git executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.git_binary = binary.into();
        self
    }
}

impl Default for GitConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceControl for GitConnector {
    #[instrument(skip(self), fields(dir = %dir.display()))]
    async fn pull(&self, repo: Option<&str>, dir: &Path) -> Result<(), GitError> {
        let start = std::time::Instant::now();
        debug!(repo, "pulling working copy");

        let mut command = Command::new(&self.git_binary);
        command.arg("pull");
        // Remote name or URL; without one git uses the branch's upstream
        if let Some(repo) = repo.filter(|r| !r.is_empty()) {
            command.arg(repo);
        }
        let output = command
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::PullFailed {
                dir: dir.to_path_buf(),
                reason: if stderr.is_empty() {
                    format!("git pull exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        info!(
            dir = %dir.display(),
            duration_ms = start.elapsed().as_millis(),
            "pulled working copy"
        );
        Ok(())
    }

    #[instrument(skip(self, project), fields(project = %project.id))]
    async fn branches(&self, project: &Project) -> Result<Vec<Branch>, GitError> {
        let path = project.path.clone();
        tokio::task::spawn_blocking(move || GitRepo::discover(&path)?.branches())
            .await
            .map_err(|e| GitError::OpenFailed(format!("branch listing aborted: {}", e)))?
    }
}
