//! Git command surface used by commitwatch.
//!
//! Every invocation goes through [`Git`], which binds a working directory,
//! an optional identity profile and an optional timeout. Nothing here writes
//! to the user's global git configuration.

use crate::error::{CommitwatchError, Result};
use crate::fsutil::normalize_path;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Hash of git's empty tree, used as the diff base in repositories without commits.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Default upper bound for a single git invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 when the process was terminated by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// The most useful error text: stderr if present, otherwise stdout.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// An operation git is in the middle of, which makes automated commits unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOperation {
    Merge,
    Rebase,
    CherryPick,
    Revert,
    Bisect,
}

impl RepoOperation {
    /// Marker files inside the git directory, checked in this order.
    const MARKERS: [(&'static str, RepoOperation); 6] = [
        ("MERGE_HEAD", RepoOperation::Merge),
        ("rebase-merge", RepoOperation::Rebase),
        ("rebase-apply", RepoOperation::Rebase),
        ("CHERRY_PICK_HEAD", RepoOperation::CherryPick),
        ("REVERT_HEAD", RepoOperation::Revert),
        ("BISECT_LOG", RepoOperation::Bisect),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepoOperation::Merge => "merge in progress",
            RepoOperation::Rebase => "rebase in progress",
            RepoOperation::CherryPick => "cherry-pick in progress",
            RepoOperation::Revert => "revert in progress",
            RepoOperation::Bisect => "bisect in progress",
        }
    }
}

impl std::fmt::Display for RepoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local branch and the time of its tip commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    /// Committer date of the tip, seconds since the Unix epoch
    pub last_commit_unix: i64,
}

/// Git invocations bound to one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
    profile: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            profile: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Apply an identity profile (a gitconfig fragment) to every command.
    ///
    /// The profile is passed with `-c include.path=...`, so it only affects
    /// the spawned process. Git refuses relative includes from the command
    /// line, so relative profiles are resolved against the current directory.
    /// Missing profile files are skipped with a warning.
    pub fn with_profile(mut self, profile: Option<PathBuf>) -> Self {
        let profile = profile.map(|p| normalize_path(&p).unwrap_or(p));
        self.profile = match profile {
            Some(p) if p.exists() => Some(p),
            Some(p) => {
                warn!(profile = %p.display(), "git identity profile not found, ignoring");
                None
            }
            None => None,
        };
        self
    }

    /// Set the per-invocation timeout. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.dir);
        if let Some(profile) = &self.profile {
            cmd.arg("-c")
                .arg(format!("include.path={}", profile.display()));
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run git and capture its output regardless of exit status.
    pub fn output(&self, args: &[&str]) -> Result<GitOutput> {
        debug!(dir = %self.dir.display(), ?args, "git");
        let mut child = self.command(args).spawn()?;

        // Drain both pipes on their own threads so a chatty child never blocks on a full pipe.
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(limit) = self.timeout {
                if start.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(dir = %self.dir.display(), ?args, "git command timed out");
                    return Err(CommitwatchError::GitTimeout(limit));
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        Ok(GitOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    /// Run git and return stdout, turning a non-zero exit into [`CommitwatchError::Git`].
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.success() {
            return Err(CommitwatchError::Git(format!(
                "'git {}' failed in {}: {}",
                args.join(" "),
                self.dir.display(),
                output.error_text()
            )));
        }
        Ok(output.stdout)
    }

    /// Check whether the directory is inside a git working tree.
    pub fn is_repo(&self) -> bool {
        self.output(&["rev-parse", "--is-inside-work-tree"])
            .map(|o| o.success() && o.stdout.trim() == "true")
            .unwrap_or(false)
    }

    /// Initialize a new repository in the directory.
    pub fn init(&self) -> Result<()> {
        self.run(&["init", "--quiet"])?;
        Ok(())
    }

    /// Check whether HEAD points at a commit (false in a freshly initialized repo).
    pub fn head_exists(&self) -> Result<bool> {
        Ok(self
            .output(&["rev-parse", "--verify", "--quiet", "HEAD"])?
            .success())
    }

    /// Get the checked-out branch name, or `None` on a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let output = self.output(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else if output.code() == 1 {
            Ok(None)
        } else {
            Err(CommitwatchError::Git(output.error_text()))
        }
    }

    /// Check if a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", branch);
        Ok(self
            .output(&["show-ref", "--verify", "--quiet", &reference])?
            .success())
    }

    /// Checkout an existing branch.
    pub fn checkout(&self, branch: &str) -> Result<()> {
        let output = self.output(&["checkout", "--quiet", branch])?;
        if !output.success() {
            return Err(CommitwatchError::Git(format!(
                "Failed to checkout branch '{}': {}",
                branch,
                output.error_text()
            )));
        }
        Ok(())
    }

    /// Create a branch from HEAD and check it out, carrying working tree changes along.
    pub fn create_and_checkout(&self, branch: &str) -> Result<()> {
        let output = self.output(&["checkout", "--quiet", "-b", branch])?;
        if !output.success() {
            return Err(CommitwatchError::Git(format!(
                "Failed to create branch '{}': {}",
                branch,
                output.error_text()
            )));
        }
        Ok(())
    }

    /// Force-delete a local branch.
    pub fn delete_branch(&self, branch: &str) -> Result<()> {
        let output = self.output(&["branch", "-D", branch])?;
        if !output.success() {
            return Err(CommitwatchError::Git(format!(
                "Failed to delete branch '{}': {}",
                branch,
                output.error_text()
            )));
        }
        Ok(())
    }

    /// List local branches under `refs/heads/<prefix>` with their tip commit times.
    pub fn list_branches(&self, prefix: &str) -> Result<Vec<BranchInfo>> {
        let pattern = format!("refs/heads/{}", prefix);
        let stdout = self.run(&[
            "for-each-ref",
            "--format=%(refname:short)%09%(committerdate:unix)",
            &pattern,
        ])?;
        Ok(parse_branch_list(&stdout))
    }

    /// Check if the working tree has no changes at all, untracked files included.
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.run(&["status", "--porcelain"])?.trim().is_empty())
    }

    /// Detect a merge, rebase or similar operation that is still in progress.
    pub fn pending_operation(&self) -> Result<Option<RepoOperation>> {
        let git_dir = PathBuf::from(self.run(&["rev-parse", "--absolute-git-dir"])?.trim());
        Ok(RepoOperation::MARKERS
            .iter()
            .find(|(marker, _)| git_dir.join(marker).exists())
            .map(|(_, op)| *op))
    }

    /// `git diff --numstat` of the working tree against `base`, NUL-separated.
    ///
    /// Paths are relative to the bound directory.
    pub fn diff_numstat(&self, base: &str) -> Result<String> {
        self.run(&[
            "diff",
            "--numstat",
            "--no-renames",
            "--relative",
            "-z",
            base,
            "--",
            ".",
        ])
    }

    /// `git diff --name-status` of the working tree against `base`, NUL-separated.
    pub fn diff_name_status(&self, base: &str) -> Result<String> {
        self.run(&[
            "diff",
            "--name-status",
            "--no-renames",
            "--relative",
            "-z",
            base,
            "--",
            ".",
        ])
    }

    /// Untracked files that are not ignored, relative to the directory.
    pub fn untracked_files(&self) -> Result<Vec<String>> {
        let stdout = self.run(&["ls-files", "--others", "--exclude-standard", "-z", "--", "."])?;
        Ok(stdout
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Stage every change inside the directory, including deletions and untracked files.
    pub fn stage_all(&self) -> Result<()> {
        self.run(&["add", "--all", "--", "."])?;
        Ok(())
    }

    /// Check whether the index differs from HEAD.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let output = if self.head_exists()? {
            self.output(&["diff", "--cached", "--quiet"])?
        } else {
            self.output(&["diff", "--cached", "--quiet", EMPTY_TREE])?
        };
        match output.code() {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CommitwatchError::Git(output.error_text())),
        }
    }

    /// Commit the index with the given message.
    pub fn commit(&self, message: &str) -> Result<GitOutput> {
        self.output(&["commit", "--quiet", "-m", message])
    }

    /// Short hash of HEAD.
    pub fn head_short(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "--short", "HEAD"])?.trim().to_string())
    }

    /// Number of commits in `range` (e.g. `main..feature`).
    pub fn rev_count(&self, range: &str) -> Result<u32> {
        let stdout = self.run(&["rev-list", "--count", range])?;
        stdout
            .trim()
            .parse()
            .map_err(|e| CommitwatchError::Git(format!("Unexpected rev-list output: {}", e)))
    }

    /// Squash-merge `branch` into the index of the current branch without committing.
    pub fn merge_squash(&self, branch: &str) -> Result<GitOutput> {
        self.output(&["merge", "--squash", "--quiet", branch])
    }

    /// Throw away a partially applied merge, restoring HEAD's tree.
    pub fn reset_merge(&self) -> Result<()> {
        self.run(&["reset", "--merge"])?;
        Ok(())
    }

    /// Read a repository-local config value.
    pub fn config_get(&self, key: &str) -> Result<Option<String>> {
        let output = self.output(&["config", "--local", "--get", key])?;
        match output.code() {
            0 => Ok(Some(output.stdout.trim().to_string())),
            1 => Ok(None),
            _ => Err(CommitwatchError::Git(output.error_text())),
        }
    }

    /// Write a repository-local config value.
    pub fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.run(&["config", "--local", key, value])?;
        Ok(())
    }
}

/// Check if a directory is inside a git working tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Git::new(dir).is_repo()
}

fn parse_branch_list(output: &str) -> Vec<BranchInfo> {
    output
        .lines()
        .filter_map(|line| {
            let (name, time) = line.split_once('\t')?;
            Some(BranchInfo {
                name: name.trim().to_string(),
                last_commit_unix: time.trim().parse().unwrap_or(0),
            })
        })
        .collect()
}
