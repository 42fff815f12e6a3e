//! Threshold classification.

use crate::config::UntrackedPolicy;
use crate::stats::ChangeStats;
use serde::Serialize;

/// How a directory's pending edits compare against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeState {
    /// No differences from HEAD and no untracked files.
    Clean,
    /// Some changes, fewer than the threshold.
    Below,
    /// At or above the threshold; eligible for an auto-commit.
    Over,
    /// Git is mid-merge/rebase; committing now would be unsafe.
    Dirty,
    /// The directory is not a git working tree.
    NotTracked,
}

impl ChangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeState::Clean => "CLEAN",
            ChangeState::Below => "BELOW",
            ChangeState::Over => "OVER",
            ChangeState::Dirty => "DIRTY",
            ChangeState::NotTracked => "NOT_TRACKED",
        }
    }
}

impl std::fmt::Display for ChangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The line total compared against the threshold under `policy`.
pub fn counted_lines(stats: &ChangeStats, policy: UntrackedPolicy) -> u64 {
    match policy {
        UntrackedPolicy::Informational => stats.total_changed_lines(),
        UntrackedPolicy::CountLines => stats.total_changed_lines() + stats.untracked_lines,
    }
}

/// Classify `stats` against `threshold`. The boundary is inclusive.
///
/// A tree with nothing pending is clean even while git is mid-operation
/// (a bisect, say); the commit path still refuses to run in that state.
pub fn evaluate(stats: &ChangeStats, threshold: u64, policy: UntrackedPolicy) -> ChangeState {
    if !stats.is_tracked_repo {
        return ChangeState::NotTracked;
    }
    if stats.is_clean() {
        return ChangeState::Clean;
    }
    if stats.pending_operation.is_some() {
        return ChangeState::Dirty;
    }
    if counted_lines(stats, policy) >= threshold {
        ChangeState::Over
    } else {
        ChangeState::Below
    }
}
