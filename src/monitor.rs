//! Monitoring passes and the operations exposed to the CLI.
//!
//! A [`Monitor`] owns nothing but a [`Registry`] handle. Every operation
//! reloads the registry, so settings changed by another invocation take
//! effect on the next pass without a restart.

use crate::branch::{SquashSummary, TempBranch, TempBranchManager};
use crate::commit::{CommitOrchestrator, CommitOutcome, CommitSummary, CommitTrigger};
use crate::config::GlobalSettings;
use crate::error::{CommitwatchError, Result};
use crate::evaluate::{counted_lines, evaluate, ChangeState};
use crate::fsutil::normalize_path;
use crate::git::Git;
use crate::registry::{ExcludeOutcome, Policy, Registry, RegistryDocument};
use crate::signal::SignalHandler;
use crate::stats::{self, ChangeStats};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Upper bound for branch ages; keeps the cutoff inside chrono's range.
const MAX_BRANCH_AGE_DAYS: u64 = 36_500;

/// What a check did beyond classifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckAction {
    None,
    Committed(CommitSummary),
    CommitFailed(String),
    /// Committing was unsafe (merge, rebase, ...).
    Skipped(String),
}

/// Outcome of looking at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReport {
    Evaluated {
        state: ChangeState,
        stats: ChangeStats,
        action: CheckAction,
    },
    /// The directory no longer exists. It stays registered until removed.
    Missing,
    /// An exclusion added after the directory was registered now covers it.
    Excluded(PathBuf),
    Error {
        kind: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStatus {
    pub path: PathBuf,
    pub name: String,
    pub threshold: u64,
    pub report: CheckReport,
}

impl DirectoryStatus {
    pub fn state(&self) -> Option<ChangeState> {
        match &self.report {
            CheckReport::Evaluated { state, .. } => Some(*state),
            _ => None,
        }
    }

    pub fn committed(&self) -> Option<&CommitSummary> {
        match &self.report {
            CheckReport::Evaluated {
                action: CheckAction::Committed(summary),
                ..
            } => Some(summary),
            _ => None,
        }
    }
}

pub struct Monitor {
    registry: Registry,
}

impl Monitor {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Registry::open_default()?))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Checking
    // ------------------------------------------------------------------

    /// Check one monitored directory and commit if it is over its threshold.
    ///
    /// A directory covered by an exclusion is reported as excluded and left alone.
    pub fn check_one(&self, path: &Path) -> Result<DirectoryStatus> {
        let path = normalize_path(path)?;
        let doc = self.registry.load()?;
        let policy = doc
            .policy(&path)
            .ok_or_else(|| CommitwatchError::NotMonitored(path.clone()))?;
        Ok(self.check_registered(&doc, &policy, true))
    }

    /// Classify a directory without committing or touching the registry.
    ///
    /// Unmonitored directories are classified against the default threshold.
    pub fn inspect(&self, path: &Path) -> Result<DirectoryStatus> {
        let path = normalize_path(path)?;
        let doc = self.registry.load()?;
        let policy = doc
            .policy(&path)
            .unwrap_or_else(|| default_policy(path, &doc.global_settings));
        Ok(self.check_policy(&policy, &doc.global_settings, false))
    }

    /// Classify every registered directory without committing.
    pub fn inspect_all(&self) -> Result<Vec<DirectoryStatus>> {
        self.pass(false)
    }

    /// One monitoring pass over every registered directory, in registry order.
    ///
    /// A failure in one directory is reported in its status and never stops
    /// the pass.
    pub fn run_cycle(&self) -> Result<Vec<DirectoryStatus>> {
        let results = self.pass(true)?;
        let committed = results.iter().filter(|r| r.committed().is_some()).count();
        info!(directories = results.len(), committed, "monitoring pass finished");
        Ok(results)
    }

    fn pass(&self, commit: bool) -> Result<Vec<DirectoryStatus>> {
        let doc = self.registry.load()?;
        Ok(doc
            .directories
            .keys()
            .filter_map(|path| doc.policy(path))
            .map(|policy| self.check_registered(&doc, &policy, commit))
            .collect())
    }

    /// Check a registered directory unless an exclusion added after
    /// registration now covers it.
    fn check_registered(
        &self,
        doc: &RegistryDocument,
        policy: &Policy,
        commit: bool,
    ) -> DirectoryStatus {
        if let Some(found) = doc.excluding_ancestor(&policy.path) {
            let blocking = found.blocking_path().to_path_buf();
            debug!(
                path = %policy.path.display(),
                blocking = %blocking.display(),
                "skipping excluded directory"
            );
            return status_for(policy, CheckReport::Excluded(blocking));
        }
        self.check_policy(policy, &doc.global_settings, commit)
    }

    fn check_policy(
        &self,
        policy: &Policy,
        settings: &GlobalSettings,
        commit: bool,
    ) -> DirectoryStatus {
        if !policy.path.is_dir() {
            warn!(path = %policy.path.display(), "monitored directory is missing");
            return status_for(policy, CheckReport::Missing);
        }

        let report = match self.evaluate_and_act(policy, settings, commit) {
            Ok(report) => report,
            Err(e) => {
                error!(path = %policy.path.display(), error = %e, "check failed");
                CheckReport::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };
        status_for(policy, report)
    }

    fn evaluate_and_act(
        &self,
        policy: &Policy,
        settings: &GlobalSettings,
        commit: bool,
    ) -> Result<CheckReport> {
        let git = Git::new(&policy.path).with_timeout(settings.git_timeout());
        let stats = match stats::gather_with(&git) {
            Ok(stats) => stats,
            Err(CommitwatchError::NotTracked(_)) => ChangeStats::not_tracked(),
            Err(e) => return Err(e),
        };
        let state = evaluate(&stats, policy.threshold, settings.untracked_policy);
        debug!(path = %policy.path.display(), state = %state, "evaluated");

        if !commit {
            return Ok(CheckReport::Evaluated {
                state,
                stats,
                action: CheckAction::None,
            });
        }

        let action = match state {
            ChangeState::Over => {
                let trigger = CommitTrigger::Threshold {
                    counted: counted_lines(&stats, settings.untracked_policy),
                    threshold: policy.threshold,
                };
                let orchestrator = CommitOrchestrator::new(&self.registry, settings);
                match orchestrator.commit(&stats, policy, trigger)? {
                    CommitOutcome::Committed(summary) => CheckAction::Committed(summary),
                    CommitOutcome::NothingToCommit => CheckAction::None,
                    CommitOutcome::DirtyState(reason) => CheckAction::Skipped(reason),
                    CommitOutcome::Failed(message) => CheckAction::CommitFailed(message),
                }
            }
            ChangeState::Dirty => CheckAction::Skipped(
                stats
                    .pending_operation
                    .map(|op| op.to_string())
                    .unwrap_or_default(),
            ),
            _ => CheckAction::None,
        };

        if !matches!(action, CheckAction::Committed(_)) {
            if let Err(e) = self.registry.touch_checked(&policy.path, Utc::now()) {
                warn!(path = %policy.path.display(), error = %e, "failed to record check time");
            }
        }

        Ok(CheckReport::Evaluated {
            state,
            stats,
            action,
        })
    }

    // ------------------------------------------------------------------
    // Registry operations
    // ------------------------------------------------------------------

    pub fn add(&self, path: &Path, threshold: Option<u64>, name: Option<&str>) -> Result<Policy> {
        self.registry.add_or_update(path, threshold, name)
    }

    pub fn remove(&self, path: &Path) -> Result<bool> {
        self.registry.remove(path)
    }

    pub fn exclude(&self, path: &Path) -> Result<ExcludeOutcome> {
        self.registry.exclude(path)
    }

    pub fn unexclude(&self, path: &Path) -> Result<bool> {
        self.registry.unexclude(path)
    }

    // ------------------------------------------------------------------
    // Commits and temp branches
    // ------------------------------------------------------------------

    /// Commit a directory's pending edits now, whatever its threshold.
    ///
    /// Works on unmonitored directories too, as long as they are not excluded.
    pub fn force_commit(&self, path: &Path) -> Result<CommitOutcome> {
        let path = normalize_path(path)?;
        if !path.is_dir() {
            return Err(CommitwatchError::DirectoryNotFound(path));
        }
        let doc = self.registry.load()?;
        doc.check_not_excluded(&path)?;

        let settings = &doc.global_settings;
        let policy = doc
            .policy(&path)
            .unwrap_or_else(|| default_policy(path.clone(), settings));

        let git = Git::new(&path).with_timeout(settings.git_timeout());
        let stats = stats::gather_with(&git)?;
        if stats.is_clean() {
            return Ok(CommitOutcome::NothingToCommit);
        }
        CommitOrchestrator::new(&self.registry, settings).commit(
            &stats,
            &policy,
            CommitTrigger::Manual,
        )
    }

    fn git_for(&self, path: &Path) -> Result<(Git, GlobalSettings, Option<PathBuf>)> {
        let path = normalize_path(path)?;
        if !path.is_dir() {
            return Err(CommitwatchError::DirectoryNotFound(path));
        }
        let doc = self.registry.load()?;
        let profile = doc
            .policy(&path)
            .and_then(|p| p.identity_profile)
            .or_else(|| doc.global_settings.git_profile_path());
        let git = Git::new(&path).with_timeout(doc.global_settings.git_timeout());
        if !git.is_repo() {
            return Err(CommitwatchError::NotTracked(path));
        }
        Ok((git, doc.global_settings, profile))
    }

    /// Fold the directory's temp branch into its origin as one commit.
    pub fn squash(&self, path: &Path, message: &str) -> Result<SquashSummary> {
        let (git, settings, profile) = self.git_for(path)?;
        let git = git.with_profile(profile);
        TempBranchManager::from_settings(&settings).squash(&git, message)
    }

    pub fn temp_branches(&self, path: &Path) -> Result<Vec<TempBranch>> {
        let (git, settings, _) = self.git_for(path)?;
        TempBranchManager::from_settings(&settings).list_temp_branches(&git)
    }

    /// Delete temp branches older than `max_age_days` (default: the configured retention).
    pub fn cleanup(&self, path: &Path, max_age_days: Option<u64>) -> Result<Vec<String>> {
        let (git, settings, _) = self.git_for(path)?;
        let days = max_age_days
            .unwrap_or(settings.temp_branch_max_age_days)
            .min(MAX_BRANCH_AGE_DAYS);
        TempBranchManager::from_settings(&settings)
            .cleanup(&git, chrono::Duration::days(days as i64))
    }

    // ------------------------------------------------------------------
    // Continuous mode
    // ------------------------------------------------------------------

    /// Run passes every `check_interval_minutes` until shutdown is requested.
    ///
    /// `on_pass` sees each pass's results. A pass that fails as a whole (e.g.
    /// the registry is locked) is logged and retried on the next tick.
    /// Returns the number of passes run.
    pub fn watch(
        &self,
        signal: &SignalHandler,
        mut on_pass: impl FnMut(&[DirectoryStatus]),
    ) -> Result<usize> {
        let mut passes = 0;
        while !signal.is_shutdown_requested() {
            match self.run_cycle() {
                Ok(results) => on_pass(&results),
                Err(e) => error!(error = %e, "monitoring pass failed"),
            }
            passes += 1;

            let interval = match self.registry.settings() {
                Ok(settings) => settings.check_interval(),
                Err(e) => {
                    warn!(error = %e, "could not reload settings, using defaults");
                    GlobalSettings::default().check_interval()
                }
            };
            if !signal.sleep(interval) {
                break;
            }
        }
        info!(passes, "watch stopped");
        Ok(passes)
    }
}

/// Policy for a directory that is not in the registry.
fn default_policy(path: PathBuf, settings: &GlobalSettings) -> Policy {
    Policy {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        threshold: settings.default_threshold,
        identity_profile: settings.git_profile_path(),
        path,
    }
}

fn status_for(policy: &Policy, report: CheckReport) -> DirectoryStatus {
    DirectoryStatus {
        path: policy.path.clone(),
        name: policy.name.clone(),
        threshold: policy.threshold,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{commit_file, git_stdout, init_repo, lines};
    use std::fs;

    fn setup() -> (tempfile::TempDir, Monitor) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("state")).unwrap();
        (dir, Monitor::new(registry))
    }

    fn repo(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        fs::create_dir_all(&path).unwrap();
        init_repo(&path);
        path
    }

    #[test]
    fn test_check_one_below_threshold_does_not_commit() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        monitor.add(&path, Some(50), None).unwrap();
        fs::write(path.join("a.txt"), lines(10, "a")).unwrap();
        // untracked only under the informational policy
        let status = monitor.check_one(&path).unwrap();
        assert_eq!(status.state(), Some(ChangeState::Below));
        assert!(status.committed().is_none());
        assert_eq!(git_stdout(&path, &["rev-list", "--count", "HEAD"]), "1");
    }

    #[test]
    fn test_check_one_over_threshold_commits() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        commit_file(&path, "a.txt", &lines(5, "a"), "a");
        monitor.add(&path, Some(10), None).unwrap();
        fs::write(path.join("a.txt"), lines(20, "b")).unwrap();

        let status = monitor.check_one(&path).unwrap();
        assert_eq!(status.state(), Some(ChangeState::Over));
        assert!(status.committed().is_some());
        let body = git_stdout(&path, &["log", "-1", "--format=%B"]);
        assert!(body.starts_with("Auto-commit: a.txt"));
    }

    #[test]
    fn test_check_one_unmonitored_is_an_error() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        assert!(matches!(
            monitor.check_one(&path),
            Err(CommitwatchError::NotMonitored(_))
        ));
    }

    #[test]
    fn test_inspect_never_commits() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        commit_file(&path, "a.txt", &lines(5, "a"), "a");
        fs::write(path.join("a.txt"), lines(100, "b")).unwrap();

        let status = monitor.inspect(&path).unwrap();
        assert_eq!(status.state(), Some(ChangeState::Over));
        assert_eq!(status.threshold, 30);
        assert_eq!(git_stdout(&path, &["rev-list", "--count", "HEAD"]), "2");
    }

    #[test]
    fn test_run_cycle_continues_past_missing_directory() {
        let (dir, monitor) = setup();
        let gone = repo(dir.path(), "gone");
        let kept = repo(dir.path(), "kept");
        monitor.add(&gone, None, None).unwrap();
        monitor.add(&kept, None, None).unwrap();
        fs::remove_dir_all(&gone).unwrap();

        let results = monitor.run_cycle().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].report, CheckReport::Missing);
        assert_eq!(results[1].state(), Some(ChangeState::Clean));
        // missing directories are flagged, not pruned
        assert_eq!(monitor.registry().list().unwrap().len(), 2);
    }

    #[test]
    fn test_run_cycle_reports_not_tracked_directory() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        monitor.add(&path, None, None).unwrap();
        fs::remove_dir_all(path.join(".git")).unwrap();

        let results = monitor.run_cycle().unwrap();
        assert_eq!(results[0].state(), Some(ChangeState::NotTracked));
    }

    #[test]
    fn test_run_cycle_skips_directory_under_new_exclusion() {
        let (dir, monitor) = setup();
        let parent = dir.path().join("work");
        let path = repo(&parent, "app");
        monitor.add(&path, None, None).unwrap();
        monitor.exclude(&parent).unwrap();

        let results = monitor.run_cycle().unwrap();
        assert_eq!(results[0].report, CheckReport::Excluded(parent));
    }

    #[test]
    fn test_check_one_leaves_directory_under_new_exclusion_alone() {
        let (dir, monitor) = setup();
        let parent = dir.path().join("work");
        let path = repo(&parent, "app");
        monitor.add(&path, Some(1), None).unwrap();
        monitor.exclude(&parent).unwrap();
        fs::write(path.join("README.md"), lines(5, "x")).unwrap();

        let status = monitor.check_one(&path).unwrap();
        assert_eq!(status.report, CheckReport::Excluded(parent));
        assert_eq!(git_stdout(&path, &["rev-list", "--count", "HEAD"]), "1");
    }

    #[test]
    fn test_inspect_all_classifies_without_committing() {
        let (dir, monitor) = setup();
        let over = repo(dir.path(), "over");
        let clean = repo(dir.path(), "clean");
        monitor.add(&over, Some(5), None).unwrap();
        monitor.add(&clean, Some(5), None).unwrap();
        fs::write(over.join("README.md"), lines(10, "x")).unwrap();
        let before = monitor.registry().list().unwrap();

        let results = monitor.inspect_all().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].state(), Some(ChangeState::Over));
        assert!(results[0].committed().is_none());
        assert_eq!(results[1].state(), Some(ChangeState::Clean));
        assert_eq!(git_stdout(&over, &["rev-list", "--count", "HEAD"]), "1");
        assert_eq!(monitor.registry().list().unwrap(), before);
    }

    #[test]
    fn test_force_commit_ignores_threshold() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        monitor.add(&path, Some(1000), None).unwrap();
        fs::write(path.join("README.md"), "changed\n").unwrap();

        let outcome = monitor.force_commit(&path).unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        let body = git_stdout(&path, &["log", "-1", "--format=%B"]);
        assert!(body.contains("manually triggered"));
    }

    #[test]
    fn test_force_commit_clean_tree_is_nothing_to_commit() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        assert_eq!(
            monitor.force_commit(&path).unwrap(),
            CommitOutcome::NothingToCommit
        );
    }

    #[test]
    fn test_force_commit_refuses_excluded_directory() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        fs::write(path.join("x.txt"), "x\n").unwrap();
        monitor.exclude(dir.path()).unwrap();
        assert!(matches!(
            monitor.force_commit(&path),
            Err(CommitwatchError::Excluded { .. })
        ));
    }

    #[test]
    fn test_watch_stops_when_shutdown_requested() {
        let (dir, monitor) = setup();
        let path = repo(dir.path(), "app");
        monitor.add(&path, None, None).unwrap();

        let signal = SignalHandler::detached();
        let mut seen = 0;
        let passes = monitor
            .watch(&signal, |results| {
                seen += results.len();
                signal.request_shutdown();
            })
            .unwrap();
        assert_eq!(passes, 1);
        assert_eq!(seen, 1);
    }
}
