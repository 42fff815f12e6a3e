use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitwatchError {
    #[error("Not a git working tree: {0}")]
    NotTracked(PathBuf),

    #[error("Directory is not monitored: {0}")]
    NotMonitored(PathBuf),

    #[error("{}", excluded_message(.path, .blocking))]
    Excluded { path: PathBuf, blocking: PathBuf },

    #[error("Unsafe repository state in {path}: {reason}")]
    DirtyState { path: PathBuf, reason: String },

    #[error("Commit failed in {path}: {message}")]
    CommitFailed { path: PathBuf, message: String },

    #[error("Nothing to squash: branch '{branch}' has no commits beyond its origin in {path}")]
    NoTempCommits { path: PathBuf, branch: String },

    #[error("Registry file is corrupt ({path}): {reason}")]
    RegistryCorrupt { path: PathBuf, reason: String },

    #[error("Registry is locked by another process: {0}")]
    ConcurrentAccess(PathBuf),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid threshold {0}: must be a positive number of lines")]
    InvalidThreshold(u64),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Git command timed out after {0:?}")]
    GitTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signal handler error: {0}")]
    SignalHandler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommitwatchError {
    /// Short machine-friendly name of the error kind, used in pass reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CommitwatchError::NotTracked(_) => "not-tracked",
            CommitwatchError::NotMonitored(_) => "not-monitored",
            CommitwatchError::Excluded { .. } => "excluded",
            CommitwatchError::DirtyState { .. } => "dirty-state",
            CommitwatchError::CommitFailed { .. } => "commit-failed",
            CommitwatchError::NoTempCommits { .. } => "no-temp-commits",
            CommitwatchError::RegistryCorrupt { .. } => "registry-corrupt",
            CommitwatchError::ConcurrentAccess(_) => "concurrent-access",
            CommitwatchError::DirectoryNotFound(_) => "directory-not-found",
            CommitwatchError::InvalidThreshold(_) => "invalid-threshold",
            CommitwatchError::Git(_) => "git",
            CommitwatchError::GitTimeout(_) => "git-timeout",
            CommitwatchError::Config(_) => "config",
            CommitwatchError::SignalHandler(_) => "signal",
            CommitwatchError::Io(_) => "io",
            CommitwatchError::Json(_) => "json",
        }
    }
}

fn excluded_message(path: &std::path::Path, blocking: &std::path::Path) -> String {
    if path == blocking {
        format!(
            "Directory is excluded from monitoring: {}\n\
             Run 'commitwatch unexclude {}' to remove it from exclusions first",
            path.display(),
            path.display()
        )
    } else {
        format!(
            "Cannot monitor {}: parent directory {} is excluded\n\
             Options:\n  \
             1. Move the directory outside of '{}'\n  \
             2. Remove the parent from exclusions: commitwatch unexclude '{}'",
            path.display(),
            blocking.display(),
            blocking.display(),
            blocking.display()
        )
    }
}

pub type Result<T> = std::result::Result<T, CommitwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_self_message_names_unexclude() {
        let err = CommitwatchError::Excluded {
            path: PathBuf::from("/work/app"),
            blocking: PathBuf::from("/work/app"),
        };
        let msg = err.to_string();
        assert!(msg.contains("excluded from monitoring"));
        assert!(msg.contains("commitwatch unexclude /work/app"));
        assert!(!msg.contains("parent"));
    }

    #[test]
    fn test_excluded_ancestor_message_names_parent() {
        let err = CommitwatchError::Excluded {
            path: PathBuf::from("/work/app/sub"),
            blocking: PathBuf::from("/work"),
        };
        let msg = err.to_string();
        assert!(msg.contains("parent directory /work is excluded"));
        assert!(msg.contains("commitwatch unexclude '/work'"));
    }

    #[test]
    fn test_error_kinds_are_distinct_for_taxonomy() {
        let kinds = [
            CommitwatchError::NotTracked(PathBuf::new()).kind(),
            CommitwatchError::DirtyState {
                path: PathBuf::new(),
                reason: String::new(),
            }
            .kind(),
            CommitwatchError::ConcurrentAccess(PathBuf::new()).kind(),
            CommitwatchError::RegistryCorrupt {
                path: PathBuf::new(),
                reason: String::new(),
            }
            .kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
