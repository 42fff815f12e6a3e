//! Persistent registry of monitored directories, exclusions and global settings.
//!
//! The registry is a single JSON document. Every mutation runs as a
//! lock → load → mutate → save cycle: the document is parsed in full,
//! changed in memory, serialized in full and renamed into place. Before each
//! write the previous document is rotated into `registry.json.backup.1`
//! (and that one into `.backup.2`), and a corrupt document is recovered
//! from the newest valid backup on the next read.

use crate::config::{self, GlobalSettings};
use crate::error::{CommitwatchError, Result};
use crate::exclusion::{ExclusionIndex, ExclusionMatch};
use crate::fsutil::{atomic_write, normalize_path};
use crate::git::Git;
use crate::lock::{RegistryLock, DEFAULT_LOCK_TIMEOUT};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const REGISTRY_FILE: &str = "registry.json";
const LOCK_FILE: &str = "registry.lock";
const BACKUP_COUNT: usize = 2;

/// Monitoring policy and bookkeeping for one directory. The absolute path is the map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredDirectory {
    pub name: String,
    pub threshold: u64,
    pub added_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_at: Option<DateTime<Utc>>,
    /// Short hash of the last auto-commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
    /// Identity profile overriding the global one for this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_profile: Option<PathBuf>,
}

/// Effective policy for a directory after resolving global defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub path: PathBuf,
    pub name: String,
    pub threshold: u64,
    pub identity_profile: Option<PathBuf>,
}

/// Result of excluding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcludeOutcome {
    /// False when the path was already excluded
    pub added: bool,
    /// True when a monitoring entry for the same path was dropped
    pub unmonitored: bool,
}

/// The whole persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub directories: IndexMap<PathBuf, MonitoredDirectory>,
    #[serde(default)]
    pub exclusions: ExclusionIndex,
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl RegistryDocument {
    /// Fail with [`CommitwatchError::Excluded`] if `path` or an ancestor is excluded.
    pub fn check_not_excluded(&self, path: &Path) -> Result<()> {
        match self.exclusions.excluding_ancestor(path) {
            Some(found) => Err(CommitwatchError::Excluded {
                path: path.to_path_buf(),
                blocking: found.blocking_path().to_path_buf(),
            }),
            None => Ok(()),
        }
    }

    /// Insert or update a directory entry. Re-adding keeps `added_at`.
    ///
    /// `threshold` and `name` fall back to the existing entry, then to the
    /// global default and the directory's basename.
    pub fn upsert_directory(
        &mut self,
        path: &Path,
        threshold: Option<u64>,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Policy> {
        self.check_not_excluded(path)?;
        if threshold == Some(0) {
            return Err(CommitwatchError::InvalidThreshold(0));
        }

        let default_threshold = self.global_settings.default_threshold;
        match self.directories.get_mut(path) {
            Some(entry) => {
                if let Some(t) = threshold {
                    entry.threshold = t;
                }
                if let Some(n) = name {
                    entry.name = n.to_string();
                }
            }
            None => {
                self.directories.insert(
                    path.to_path_buf(),
                    MonitoredDirectory {
                        name: name.map(str::to_string).unwrap_or_else(|| default_name(path)),
                        threshold: threshold.unwrap_or(default_threshold),
                        added_at: now,
                        last_checked_at: now,
                        last_commit_at: None,
                        last_commit: None,
                        git_profile: None,
                    },
                );
            }
        }

        self.policy(path)
            .ok_or_else(|| CommitwatchError::Config("directory entry vanished".to_string()))
    }

    /// Remove a monitoring entry. Returns whether one existed.
    pub fn remove_directory(&mut self, path: &Path) -> bool {
        self.directories.shift_remove(path).is_some()
    }

    /// Exclude `path`, dropping a monitoring entry for the same path.
    pub fn exclude(&mut self, path: &Path, now: DateTime<Utc>) -> ExcludeOutcome {
        let unmonitored = self.remove_directory(path);
        let added = self.exclusions.add(path.to_path_buf(), now);
        ExcludeOutcome { added, unmonitored }
    }

    pub fn unexclude(&mut self, path: &Path) -> bool {
        self.exclusions.remove(path)
    }

    pub fn excluding_ancestor(&self, path: &Path) -> Option<ExclusionMatch> {
        self.exclusions.excluding_ancestor(path)
    }

    /// Resolve the effective policy for a monitored directory.
    pub fn policy(&self, path: &Path) -> Option<Policy> {
        let entry = self.directories.get(path)?;
        let identity_profile = entry
            .git_profile
            .as_deref()
            .map(config::expand_home)
            .or_else(|| self.global_settings.git_profile_path());
        Some(Policy {
            path: path.to_path_buf(),
            name: entry.name.clone(),
            threshold: entry.threshold,
            identity_profile,
        })
    }
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handle to the on-disk registry.
#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl Registry {
    /// Open the registry in the default config directory.
    pub fn open_default() -> Result<Self> {
        Self::open(config::ensure_config_dir()?)
    }

    /// Open (creating the directory if needed) the registry stored in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    pub fn backup_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.backup.{}", REGISTRY_FILE, n))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Take the registry lock for a multi-step operation.
    pub fn lock(&self) -> Result<RegistryLock> {
        RegistryLock::acquire(&self.lock_path(), self.lock_timeout)
    }

    /// Load the document, falling back to the newest valid backup if it is corrupt.
    ///
    /// A missing registry with no backups is an empty registry. A corrupt
    /// registry with no valid backup is an error; it is never replaced by an
    /// empty one.
    pub fn load(&self) -> Result<RegistryDocument> {
        let path = self.path();
        let primary = match fs::read_to_string(&path) {
            Ok(content) => Some(parse_document(&path, &content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let failure = match primary {
            Some(Ok(doc)) => return Ok(doc),
            Some(Err(e)) => e,
            None if !self.backup_path(1).exists() => return Ok(RegistryDocument::default()),
            None => CommitwatchError::RegistryCorrupt {
                path: path.clone(),
                reason: "registry file is missing but backups exist".to_string(),
            },
        };

        for n in 1..=BACKUP_COUNT {
            let backup = self.backup_path(n);
            let Ok(content) = fs::read_to_string(&backup) else {
                continue;
            };
            match parse_document(&backup, &content) {
                Ok(doc) => {
                    warn!(
                        registry = %path.display(),
                        backup = %backup.display(),
                        error = %failure,
                        "registry unreadable, recovered from backup"
                    );
                    return Ok(doc);
                }
                Err(e) => warn!(backup = %backup.display(), error = %e, "backup unreadable"),
            }
        }

        Err(failure)
    }

    /// Run a read-modify-write cycle under the registry lock.
    ///
    /// The document is saved only when `f` succeeds; on error the file on
    /// disk is left untouched.
    pub fn update<T>(&self, f: impl FnOnce(&mut RegistryDocument) -> Result<T>) -> Result<T> {
        let _lock = self.lock()?;
        let mut doc = self.load()?;
        let value = f(&mut doc)?;
        self.save_locked(&doc)?;
        Ok(value)
    }

    /// Rotate backups and atomically replace the document. Caller holds the lock.
    fn save_locked(&self, doc: &RegistryDocument) -> Result<()> {
        let path = self.path();
        self.rotate_backups()?;
        let content = serde_json::to_string_pretty(doc)?;
        atomic_write(&path, content.as_bytes())
    }

    fn rotate_backups(&self) -> Result<()> {
        let path = self.path();
        let current = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if parse_document(&path, &current).is_err() {
            // Keep the broken file for inspection but out of the backup chain.
            let corrupt = self.dir.join(format!("{}.corrupt", REGISTRY_FILE));
            warn!(path = %corrupt.display(), "moving corrupt registry aside");
            fs::rename(&path, corrupt)?;
            return Ok(());
        }

        for n in (1..BACKUP_COUNT).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        atomic_write(&self.backup_path(1), current.as_bytes())
    }

    // ------------------------------------------------------------------
    // Directory operations
    // ------------------------------------------------------------------

    /// Start monitoring `path`, or update its policy if already monitored.
    ///
    /// Fails with [`CommitwatchError::Excluded`] if the path or a parent is
    /// excluded, and with [`CommitwatchError::NotTracked`] if it is not a git
    /// working tree and `auto_init_git` is off; with it on, a repository is
    /// initialized first.
    pub fn add_or_update(
        &self,
        path: &Path,
        threshold: Option<u64>,
        name: Option<&str>,
    ) -> Result<Policy> {
        let path = normalize_path(path)?;
        if !path.is_dir() {
            return Err(CommitwatchError::DirectoryNotFound(path));
        }

        self.update(|doc| {
            doc.check_not_excluded(&path)?;
            let git = Git::new(&path).with_timeout(doc.global_settings.git_timeout());
            if !git.is_repo() {
                if !doc.global_settings.auto_init_git {
                    return Err(CommitwatchError::NotTracked(path.clone()));
                }
                git.init()?;
                info!(path = %path.display(), "initialized git repository");
            }
            doc.upsert_directory(&path, threshold, name, Utc::now())
        })
    }

    /// Set or clear the per-directory identity profile.
    pub fn set_directory_profile(&self, path: &Path, profile: Option<PathBuf>) -> Result<()> {
        let path = normalize_path(path)?;
        self.update(|doc| match doc.directories.get_mut(&path) {
            Some(entry) => {
                entry.git_profile = profile;
                Ok(())
            }
            None => Err(CommitwatchError::NotMonitored(path.clone())),
        })
    }

    /// Stop monitoring `path`. Returns whether it was monitored.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path)?;
        if !self.load()?.directories.contains_key(&path) {
            return Ok(false);
        }
        self.update(|doc| Ok(doc.remove_directory(&path)))
    }

    /// Monitored directories in insertion order.
    pub fn list(&self) -> Result<Vec<(PathBuf, MonitoredDirectory)>> {
        Ok(self.load()?.directories.into_iter().collect())
    }

    /// Effective policy for a monitored directory, or `None` if it is not monitored.
    pub fn get_policy(&self, path: &Path) -> Result<Option<Policy>> {
        let path = normalize_path(path)?;
        Ok(self.load()?.policy(&path))
    }

    /// Record that a pass looked at `path`.
    pub fn touch_checked(&self, path: &Path, at: DateTime<Utc>) -> Result<()> {
        self.update(|doc| {
            if let Some(entry) = doc.directories.get_mut(path) {
                entry.last_checked_at = at;
            }
            Ok(())
        })
    }

    /// Record a successful auto-commit on `path`.
    pub fn record_commit(&self, path: &Path, at: DateTime<Utc>, commit: &str) -> Result<()> {
        self.update(|doc| {
            if let Some(entry) = doc.directories.get_mut(path) {
                entry.last_checked_at = at;
                entry.last_commit_at = Some(at);
                entry.last_commit = Some(commit.to_string());
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Exclusions
    // ------------------------------------------------------------------

    /// Exclude `path` (and everything below it) from monitoring.
    pub fn exclude(&self, path: &Path) -> Result<ExcludeOutcome> {
        let path = normalize_path(path)?;
        self.update(|doc| Ok(doc.exclude(&path, Utc::now())))
    }

    /// Remove an exclusion. Returns whether it existed.
    pub fn unexclude(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path)?;
        if !self.load()?.exclusions.contains(&path) {
            return Ok(false);
        }
        self.update(|doc| Ok(doc.unexclude(&path)))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Result<GlobalSettings> {
        Ok(self.load()?.global_settings)
    }

    /// Change one setting by key, validating the result.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<GlobalSettings> {
        self.update(|doc| {
            config::set_setting(&mut doc.global_settings, key, value)?;
            Ok(doc.global_settings.clone())
        })
    }
}

fn parse_document(path: &Path, content: &str) -> Result<RegistryDocument> {
    serde_json::from_str(content).map_err(|e| CommitwatchError::RegistryCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_repo;

    fn registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("state")).unwrap();
        (dir, registry)
    }

    fn repo_in(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        fs::create_dir_all(&path).unwrap();
        init_repo(&path);
        path
    }

    #[test]
    fn test_load_missing_registry_is_empty() {
        let (_dir, registry) = registry();
        let doc = registry.load().unwrap();
        assert!(doc.directories.is_empty());
        assert_eq!(doc.global_settings, GlobalSettings::default());
    }

    #[test]
    fn test_add_or_update_twice_yields_one_entry() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "app");

        registry.add_or_update(&repo, Some(50), Some("App")).unwrap();
        let first = registry.list().unwrap();
        registry.add_or_update(&repo, Some(50), Some("App")).unwrap();
        let second = registry.list().unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(first[0].1.added_at, second[0].1.added_at);
    }

    #[test]
    fn test_add_uses_defaults_for_missing_arguments() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "project");

        let policy = registry.add_or_update(&repo, None, None).unwrap();
        assert_eq!(policy.threshold, 30);
        assert_eq!(policy.name, "project");
    }

    #[test]
    fn test_update_changes_threshold_but_keeps_name() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "svc");

        registry.add_or_update(&repo, Some(10), Some("Service")).unwrap();
        let policy = registry.add_or_update(&repo, Some(99), None).unwrap();
        assert_eq!(policy.threshold, 99);
        assert_eq!(policy.name, "Service");
    }

    #[test]
    fn test_add_rejects_zero_threshold_without_writing() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "zero");

        let result = registry.add_or_update(&repo, Some(0), None);
        assert!(matches!(result, Err(CommitwatchError::InvalidThreshold(0))));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_non_repo_without_auto_init_fails() {
        let (dir, registry) = registry();
        registry.set_setting("auto_init_git", "false").unwrap();
        let plain = dir.path().join("plain");
        fs::create_dir(&plain).unwrap();

        let result = registry.add_or_update(&plain, None, None);
        assert!(matches!(result, Err(CommitwatchError::NotTracked(_))));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_non_repo_with_auto_init_initializes() {
        let (dir, registry) = registry();
        let plain = dir.path().join("fresh");
        fs::create_dir(&plain).unwrap();

        registry.add_or_update(&plain, Some(5), None).unwrap();
        assert!(crate::git::is_git_repo(&plain));
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_add_missing_directory_fails() {
        let (dir, registry) = registry();
        let result = registry.add_or_update(&dir.path().join("nope"), None, None);
        assert!(matches!(result, Err(CommitwatchError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_add_excluded_self_and_ancestor_are_distinguished() {
        let (dir, registry) = registry();
        let parent = dir.path().join("work");
        let repo = repo_in(&parent, "app");

        registry.exclude(&repo).unwrap();
        match registry.add_or_update(&repo, None, None) {
            Err(CommitwatchError::Excluded { path, blocking }) => assert_eq!(path, blocking),
            other => panic!("expected self exclusion, got {other:?}"),
        }

        registry.unexclude(&repo).unwrap();
        registry.exclude(&parent).unwrap();
        match registry.add_or_update(&repo, None, None) {
            Err(CommitwatchError::Excluded { path, blocking }) => {
                assert_eq!(path, repo);
                assert_eq!(blocking, parent);
            }
            other => panic!("expected ancestor exclusion, got {other:?}"),
        }
    }

    #[test]
    fn test_exclude_removes_monitoring_entry() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "app");
        registry.add_or_update(&repo, None, None).unwrap();

        let outcome = registry.exclude(&repo).unwrap();
        assert!(outcome.added);
        assert!(outcome.unmonitored);

        let doc = registry.load().unwrap();
        assert!(doc.directories.is_empty());
        assert!(doc.exclusions.contains(&repo));
    }

    #[test]
    fn test_exclude_twice_is_idempotent() {
        let (dir, registry) = registry();
        registry.exclude(dir.path()).unwrap();
        let outcome = registry.exclude(dir.path()).unwrap();
        assert!(!outcome.added);
        assert_eq!(registry.load().unwrap().exclusions.len(), 1);
    }

    #[test]
    fn test_remove_and_unexclude_report_whether_entry_existed() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "app");

        assert!(!registry.remove(&repo).unwrap());
        registry.add_or_update(&repo, None, None).unwrap();
        assert!(registry.remove(&repo).unwrap());
        assert!(!registry.remove(&repo).unwrap());

        assert!(!registry.unexclude(&repo).unwrap());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let (dir, registry) = registry();
        let names = ["zeta", "alpha", "mid"];
        for name in names {
            let repo = repo_in(dir.path(), name);
            registry.add_or_update(&repo, None, None).unwrap();
        }
        let listed: Vec<String> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|(_, d)| d.name)
            .collect();
        assert_eq!(listed, names);
    }

    #[test]
    fn test_policy_resolves_profile_overrides() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "app");
        registry.add_or_update(&repo, None, None).unwrap();
        registry.set_setting("git_profile", "/etc/global.gitconfig").unwrap();

        let policy = registry.get_policy(&repo).unwrap().unwrap();
        assert_eq!(
            policy.identity_profile,
            Some(PathBuf::from("/etc/global.gitconfig"))
        );

        registry
            .set_directory_profile(&repo, Some(PathBuf::from("/etc/app.gitconfig")))
            .unwrap();
        let policy = registry.get_policy(&repo).unwrap().unwrap();
        assert_eq!(
            policy.identity_profile,
            Some(PathBuf::from("/etc/app.gitconfig"))
        );
    }

    #[test]
    fn test_get_policy_unmonitored_is_none() {
        let (dir, registry) = registry();
        assert!(registry.get_policy(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_saves_rotate_two_backups() {
        let (dir, registry) = registry();
        for name in ["one", "two", "three"] {
            let repo = repo_in(dir.path(), name);
            registry.add_or_update(&repo, None, None).unwrap();
        }

        let b1: RegistryDocument =
            serde_json::from_str(&fs::read_to_string(registry.backup_path(1)).unwrap()).unwrap();
        let b2: RegistryDocument =
            serde_json::from_str(&fs::read_to_string(registry.backup_path(2)).unwrap()).unwrap();
        assert_eq!(b1.directories.len(), 2);
        assert_eq!(b2.directories.len(), 1);
        assert!(!registry.backup_path(3).exists());
    }

    #[test]
    fn test_corrupt_registry_recovers_from_backup() {
        let (dir, registry) = registry();
        let a = repo_in(dir.path(), "a");
        let b = repo_in(dir.path(), "b");
        registry.add_or_update(&a, None, None).unwrap();
        registry.add_or_update(&b, None, None).unwrap();

        fs::write(registry.path(), "{ this is not json").unwrap();
        let doc = registry.load().unwrap();
        assert_eq!(doc.directories.len(), 1);
        assert!(doc.directories.contains_key(&a));
    }

    #[test]
    fn test_corrupt_registry_without_backup_fails_loudly() {
        let (_dir, registry) = registry();
        fs::write(registry.path(), "garbage").unwrap();
        assert!(matches!(
            registry.load(),
            Err(CommitwatchError::RegistryCorrupt { .. })
        ));
        assert!(matches!(
            registry.exclude(Path::new("/x")),
            Err(CommitwatchError::RegistryCorrupt { .. })
        ));
        assert_eq!(fs::read_to_string(registry.path()).unwrap(), "garbage");
    }

    #[test]
    fn test_write_after_recovery_sets_corrupt_file_aside() {
        let (dir, registry) = registry();
        let a = repo_in(dir.path(), "a");
        let b = repo_in(dir.path(), "b");
        registry.add_or_update(&a, None, None).unwrap();
        registry.add_or_update(&b, None, None).unwrap();
        fs::write(registry.path(), "{broken").unwrap();

        registry.exclude(&dir.path().join("elsewhere")).unwrap();

        assert!(dir.path().join("state/registry.json.corrupt").exists());
        let doc = registry.load().unwrap();
        assert_eq!(doc.directories.len(), 1);
        assert_eq!(doc.exclusions.len(), 1);
        // The good backup was not displaced by the corrupt document.
        let b1: RegistryDocument =
            serde_json::from_str(&fs::read_to_string(registry.backup_path(1)).unwrap()).unwrap();
        assert_eq!(b1.directories.len(), 1);
    }

    #[test]
    fn test_failed_mutation_leaves_file_unchanged() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "a");
        registry.add_or_update(&repo, None, None).unwrap();
        let before = fs::read_to_string(registry.path()).unwrap();

        let result: Result<()> = registry.update(|doc| {
            doc.directories.clear();
            Err(CommitwatchError::Config("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_update_fails_when_lock_is_held() {
        let (_dir, registry) = registry();
        let registry = registry.with_lock_timeout(Duration::from_millis(50));
        let _held = RegistryLock::acquire(&registry.dir().join(LOCK_FILE), Duration::from_secs(1))
            .unwrap();

        let result = registry.update(|_| Ok(()));
        assert!(matches!(result, Err(CommitwatchError::ConcurrentAccess(_))));
    }

    #[test]
    fn test_record_commit_updates_metadata() {
        let (dir, registry) = registry();
        let repo = repo_in(dir.path(), "a");
        registry.add_or_update(&repo, None, None).unwrap();

        let at = Utc::now();
        registry.record_commit(&repo, at, "abc1234").unwrap();
        let (_, entry) = registry.list().unwrap().remove(0);
        assert_eq!(entry.last_commit.as_deref(), Some("abc1234"));
        assert_eq!(entry.last_commit_at, Some(at));
        assert_eq!(entry.last_checked_at, at);
    }

    #[test]
    fn test_document_shape_matches_persisted_layout() {
        let mut doc = RegistryDocument::default();
        doc.upsert_directory(Path::new("/w/app"), Some(40), Some("App"), Utc::now())
            .unwrap();
        doc.exclude(Path::new("/w/vendor"), Utc::now());

        let json = serde_json::to_value(&doc).unwrap();
        let entry = &json["directories"]["/w/app"];
        assert_eq!(entry["name"], "App");
        assert_eq!(entry["threshold"], 40);
        assert!(entry.get("added_at").is_some());
        assert!(entry.get("last_checked_at").is_some());
        assert!(json["exclusions"]["/w/vendor"].get("excluded_at").is_some());
        assert_eq!(json["global_settings"]["default_threshold"], 30);
    }
}
