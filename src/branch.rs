//! Disposable branches that collect auto-commits until they are squashed.
//!
//! Each monitored directory gets one temp branch with a deterministic name,
//! `<prefix>/<dirname>-<hash>`. The branch it was created from is remembered
//! in the repository's local config (`branch.<temp>.commitwatch-origin`) so
//! a later squash knows where to land. Deleting the branch drops that config
//! section along with it.

use crate::config::GlobalSettings;
use crate::error::{CommitwatchError, Result};
use crate::git::Git;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, warn};

const ORIGIN_CONFIG_KEY: &str = "commitwatch-origin";

/// A temp branch as shown by `commitwatch branches`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempBranch {
    pub name: String,
    pub origin: Option<String>,
    /// Commits ahead of the origin, if the origin is known and still exists
    pub ahead: Option<u32>,
    pub last_commit: Option<DateTime<Utc>>,
    pub is_current: bool,
}

/// Result of a successful squash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashSummary {
    pub branch: String,
    pub origin: String,
    pub commits_squashed: u32,
    pub commit: String,
}

#[derive(Debug, Clone)]
pub struct TempBranchManager {
    prefix: String,
}

impl TempBranchManager {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_settings(settings: &GlobalSettings) -> Self {
        Self::new(settings.temp_branch_prefix.clone())
    }

    /// The temp branch name for a directory. Stable for a given absolute path.
    pub fn branch_name(&self, dir: &Path) -> String {
        let digest = Sha256::digest(dir.to_string_lossy().as_bytes());
        let hash = hex::encode(digest);
        let base = dir
            .file_name()
            .map(|n| slugify(&n.to_string_lossy()))
            .unwrap_or_default();
        let base = if base.is_empty() { "root".to_string() } else { base };
        format!("{}/{}-{}", self.prefix, base, &hash[..8])
    }

    fn origin_key(branch: &str) -> String {
        format!("branch.{}.{}", branch, ORIGIN_CONFIG_KEY)
    }

    /// The branch `branch` was created from, if recorded.
    pub fn origin_of(&self, git: &Git, branch: &str) -> Result<Option<String>> {
        git.config_get(&Self::origin_key(branch))
    }

    /// Make sure the directory's temp branch exists and is checked out.
    ///
    /// Creates it from the current HEAD on first use, carrying any working
    /// tree changes along. Idempotent.
    pub fn ensure_branch(&self, git: &Git) -> Result<String> {
        let name = self.branch_name(git.dir());
        let current = git
            .current_branch()?
            .ok_or_else(|| CommitwatchError::DirtyState {
                path: git.dir().to_path_buf(),
                reason: "HEAD is detached".to_string(),
            })?;

        if current == name {
            return Ok(name);
        }

        if git.branch_exists(&name)? {
            git.checkout(&name)?;
            debug!(branch = %name, "switched to existing temp branch");
            return Ok(name);
        }

        if !git.head_exists()? {
            return Err(CommitwatchError::Git(format!(
                "branch '{}' has no commits yet; temp branches need a starting point",
                current
            )));
        }

        git.create_and_checkout(&name)?;
        git.config_set(&Self::origin_key(&name), &current)?;
        info!(branch = %name, origin = %current, "created temp branch");
        Ok(name)
    }

    /// Fold every commit on the temp branch into one commit on its origin.
    ///
    /// Refuses to run with uncommitted changes or an operation in progress.
    /// On a failed merge the origin is reset and the temp branch checked out
    /// again, so nothing is lost.
    pub fn squash(&self, git: &Git, message: &str) -> Result<SquashSummary> {
        let dir = git.dir().to_path_buf();
        let name = self.branch_name(&dir);

        if let Some(op) = git.pending_operation()? {
            return Err(CommitwatchError::DirtyState {
                path: dir,
                reason: op.to_string(),
            });
        }
        if !git.is_clean()? {
            return Err(CommitwatchError::DirtyState {
                path: dir,
                reason: "uncommitted changes present; commit or stash them first".to_string(),
            });
        }

        let no_commits = || CommitwatchError::NoTempCommits {
            path: git.dir().to_path_buf(),
            branch: name.clone(),
        };
        if !git.branch_exists(&name)? {
            return Err(no_commits());
        }

        let origin = self.origin_of(git, &name)?.ok_or_else(|| {
            CommitwatchError::Git(format!("no origin branch recorded for '{}'", name))
        })?;
        if !git.branch_exists(&origin)? {
            return Err(CommitwatchError::Git(format!(
                "origin branch '{}' of '{}' no longer exists",
                origin, name
            )));
        }

        let count = git.rev_count(&format!("{}..{}", origin, name))?;
        if count == 0 {
            return Err(no_commits());
        }

        let start = git.current_branch()?;
        if start.as_deref() != Some(origin.as_str()) {
            git.checkout(&origin)?;
        }

        let merged = git.merge_squash(&name)?;
        if !merged.success() {
            self.restore(git, &name);
            return Err(CommitwatchError::CommitFailed {
                path: dir,
                message: merged.error_text(),
            });
        }

        let committed = git.commit(message)?;
        if !committed.success() {
            self.restore(git, &name);
            return Err(CommitwatchError::CommitFailed {
                path: dir,
                message: committed.error_text(),
            });
        }

        let commit = git.head_short()?;
        git.delete_branch(&name)?;
        info!(branch = %name, origin = %origin, commits = count, commit = %commit, "squashed temp branch");

        Ok(SquashSummary {
            branch: name,
            origin,
            commits_squashed: count,
            commit,
        })
    }

    fn restore(&self, git: &Git, branch: &str) {
        if let Err(e) = git.reset_merge() {
            warn!(error = %e, "failed to abort squash merge");
        }
        if let Err(e) = git.checkout(branch) {
            warn!(branch = %branch, error = %e, "failed to return to temp branch");
        }
    }

    /// All temp branches in the repository.
    pub fn list_temp_branches(&self, git: &Git) -> Result<Vec<TempBranch>> {
        let current = git.current_branch()?;
        let mut branches = Vec::new();
        for info in git.list_branches(&self.prefix)? {
            let origin = self.origin_of(git, &info.name)?;
            let ahead = match &origin {
                Some(o) if git.branch_exists(o)? => {
                    Some(git.rev_count(&format!("{}..{}", o, info.name))?)
                }
                _ => None,
            };
            branches.push(TempBranch {
                is_current: current.as_deref() == Some(info.name.as_str()),
                last_commit: DateTime::from_timestamp(info.last_commit_unix, 0),
                name: info.name,
                origin,
                ahead,
            });
        }
        Ok(branches)
    }

    /// Delete temp branches whose last commit is older than `older_than`.
    pub fn cleanup(&self, git: &Git, older_than: Duration) -> Result<Vec<String>> {
        self.cleanup_before(git, Utc::now() - older_than)
    }

    /// Delete temp branches whose last commit predates `cutoff`.
    ///
    /// The checked-out branch is never deleted. Returns the deleted names.
    pub fn cleanup_before(&self, git: &Git, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let current = git.current_branch()?;
        let mut deleted = Vec::new();
        for info in git.list_branches(&self.prefix)? {
            if current.as_deref() == Some(info.name.as_str()) {
                debug!(branch = %info.name, "skipping checked-out temp branch");
                continue;
            }
            if info.last_commit_unix < cutoff.timestamp() {
                git.delete_branch(&info.name)?;
                info!(branch = %info.name, "deleted stale temp branch");
                deleted.push(info.name);
            }
        }
        Ok(deleted)
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
