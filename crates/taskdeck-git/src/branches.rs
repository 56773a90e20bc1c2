//! Branch listing

use git2::BranchType;

use taskdeck_core::Branch;

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// List local branches with their tip commit, current branch flagged
    pub fn branches(&self) -> Result<Vec<Branch>> {
        let current = self.current_branch()?;
        let mut branches = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let name = match branch.name()? {
                Some(name) => name.to_string(),
                None => continue,
            };
            let commit = branch.get().peel_to_commit()?;
            let hash = commit.id().to_string();

            branches.push(Branch {
                current: current.as_deref() == Some(name.as_str()),
                name,
                commit: hash.chars().take(7).collect(),
                label: commit.summary().unwrap_or_default().to_string(),
            });
        }

        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }
}
