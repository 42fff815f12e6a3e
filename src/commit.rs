//! Staging and committing pending edits.

use crate::branch::TempBranchManager;
use crate::config::GlobalSettings;
use crate::error::{CommitwatchError, Result};
use crate::git::Git;
use crate::registry::{Policy, Registry};
use crate::stats::{format_file_changes, ChangeStats};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

/// How many files are named in a commit title before it says "+N more files".
const TITLE_FILE_LIMIT: usize = 3;

/// Why a commit is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// A monitoring pass found `counted` changed lines against `threshold`.
    Threshold { counted: u64, threshold: u64 },
    /// Forced by the user.
    Manual,
}

/// What a successful commit contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub commit: String,
    pub branch: Option<String>,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub total_changed: u64,
    pub files_changed: u64,
    pub untracked_files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(CommitSummary),
    /// The working tree was already clean.
    NothingToCommit,
    /// A merge, rebase or similar is in progress; nothing was touched.
    DirtyState(String),
    /// Staging or committing failed; carries git's error text.
    Failed(String),
}

/// Build the commit message for `stats`.
///
/// The title names the largest changed files; the body records the
/// statistics that drove the commit.
pub fn build_commit_message(
    name: &str,
    stats: &ChangeStats,
    trigger: CommitTrigger,
    at: DateTime<Utc>,
) -> String {
    let summary = format_file_changes(&stats.files, TITLE_FILE_LIMIT);
    let (title, marker) = match trigger {
        CommitTrigger::Threshold { counted, threshold } => (
            format!("Auto-commit: {}", summary),
            format!("threshold exceeded ({} >= {})", counted, threshold),
        ),
        CommitTrigger::Manual => (
            format!("Manual commit: {}", summary),
            "manually triggered".to_string(),
        ),
    };

    let mut body = vec![
        format!("Project: {}", name),
        format!("Timestamp: {}", at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        format!("Trigger: {}", marker),
        String::new(),
        format!("Lines added: {}", stats.lines_added),
        format!("Lines deleted: {}", stats.lines_deleted),
        format!("Total changed: {}", stats.total_changed_lines()),
        format!("Files changed: {}", stats.files_changed),
    ];
    if stats.untracked_file_count > 0 {
        body.push(format!(
            "Untracked files: {} ({} lines)",
            stats.untracked_file_count, stats.untracked_lines
        ));
    }

    format!("{}\n\n{}\n\nCommitted by commitwatch", title, body.join("\n"))
}

/// Commits a directory's pending edits under its policy.
pub struct CommitOrchestrator<'a> {
    registry: &'a Registry,
    settings: &'a GlobalSettings,
}

impl<'a> CommitOrchestrator<'a> {
    pub fn new(registry: &'a Registry, settings: &'a GlobalSettings) -> Self {
        Self { registry, settings }
    }

    /// Stage everything in the directory and commit it.
    ///
    /// Expected failures (git errors, nothing left to commit because another
    /// process got there first) come back as [`CommitOutcome::Failed`]; only
    /// a missing directory is an `Err`.
    pub fn commit(
        &self,
        stats: &ChangeStats,
        policy: &Policy,
        trigger: CommitTrigger,
    ) -> Result<CommitOutcome> {
        if !policy.path.is_dir() {
            return Err(CommitwatchError::DirectoryNotFound(policy.path.clone()));
        }

        let git = Git::new(&policy.path)
            .with_profile(policy.identity_profile.clone())
            .with_timeout(self.settings.git_timeout());

        match self.try_commit(&git, stats, policy, trigger) {
            Ok(outcome) => Ok(outcome),
            Err(CommitwatchError::DirtyState { reason, .. }) => {
                Ok(CommitOutcome::DirtyState(reason))
            }
            Err(
                e @ (CommitwatchError::Git(_)
                | CommitwatchError::GitTimeout(_)
                | CommitwatchError::CommitFailed { .. }
                | CommitwatchError::Io(_)),
            ) => {
                warn!(path = %policy.path.display(), error = %e, "commit failed");
                Ok(CommitOutcome::Failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn try_commit(
        &self,
        git: &Git,
        stats: &ChangeStats,
        policy: &Policy,
        trigger: CommitTrigger,
    ) -> Result<CommitOutcome> {
        let pending = match stats.pending_operation {
            Some(op) => Some(op),
            None => git.pending_operation()?,
        };
        if let Some(op) = pending {
            return Ok(CommitOutcome::DirtyState(op.to_string()));
        }

        if self.settings.temp_branch_strategy {
            TempBranchManager::from_settings(self.settings).ensure_branch(git)?;
        }

        git.stage_all()?;
        if !git.has_staged_changes()? {
            return Ok(CommitOutcome::Failed(
                "nothing to commit; the working tree changed since it was checked".to_string(),
            ));
        }

        let now = Utc::now();
        let message = build_commit_message(&policy.name, stats, trigger, now);
        let output = git.commit(&message)?;
        if !output.success() {
            return Err(CommitwatchError::CommitFailed {
                path: policy.path.clone(),
                message: output.error_text(),
            });
        }

        let commit = git.head_short()?;
        let branch = git.current_branch()?;
        info!(
            path = %policy.path.display(),
            commit = %commit,
            lines = stats.total_changed_lines(),
            "committed changes"
        );

        // The commit exists regardless; a registry hiccup only loses metadata.
        if let Err(e) = self.registry.record_commit(&policy.path, now, &commit) {
            warn!(path = %policy.path.display(), error = %e, "failed to record commit");
        }

        Ok(CommitOutcome::Committed(CommitSummary {
            commit,
            branch,
            lines_added: stats.lines_added,
            lines_deleted: stats.lines_deleted,
            total_changed: stats.total_changed_lines(),
            files_changed: stats.files_changed,
            untracked_files: stats.untracked_file_count,
        }))
    }
}
