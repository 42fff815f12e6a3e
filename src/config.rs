use crate::error::{CommitwatchError, Result};
use crate::fsutil::normalize_path;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "commitwatch";

/// Environment variable that relocates the whole config directory.
pub const HOME_ENV: &str = "COMMITWATCH_HOME";

/// Threshold used when a directory is added without one.
pub const DEFAULT_THRESHOLD: u64 = 30;

/// Prefix for auto-commit branches.
pub const DEFAULT_TEMP_BRANCH_PREFIX: &str = "commitwatch-auto";

// ============================================================================
// Global Settings
// ============================================================================

/// Whether untracked files can push a directory over its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UntrackedPolicy {
    /// Untracked files are reported but only tracked line changes are compared.
    #[default]
    Informational,
    /// Text lines of untracked files are added to the changed-line total.
    CountLines,
}

impl std::str::FromStr for UntrackedPolicy {
    type Err = CommitwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "informational" => Ok(UntrackedPolicy::Informational),
            "count-lines" => Ok(UntrackedPolicy::CountLines),
            other => Err(CommitwatchError::Config(format!(
                "Invalid untracked policy '{}': expected 'informational' or 'count-lines'",
                other
            ))),
        }
    }
}

/// Process-wide settings, stored in the `global_settings` section of the registry.
///
/// Loaded fresh at the start of every invocation and passed explicitly to
/// the operations that need it. Missing fields fall back to their defaults,
/// so documents written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Threshold applied when `add` is called without one.
    #[serde(default = "default_threshold")]
    pub default_threshold: u64,

    /// Path to a gitconfig fragment with the identity used for auto-commits.
    #[serde(default)]
    pub git_profile: Option<PathBuf>,

    /// Run `git init` when adding a directory that is not a repository.
    #[serde(default = "default_true")]
    pub auto_init_git: bool,

    /// Interval between passes in `watch` mode.
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,

    /// Commit onto a per-directory disposable branch instead of the current branch.
    #[serde(default)]
    pub temp_branch_strategy: bool,

    #[serde(default = "default_temp_branch_prefix")]
    pub temp_branch_prefix: String,

    /// Age after which `cleanup` deletes abandoned auto-commit branches.
    #[serde(default = "default_temp_branch_max_age")]
    pub temp_branch_max_age_days: u64,

    #[serde(default = "default_log_retention")]
    pub log_retention_days: u64,

    #[serde(default)]
    pub untracked_policy: UntrackedPolicy,

    /// Upper bound for a single git invocation; 0 disables the limit.
    #[serde(default = "default_git_timeout")]
    pub git_timeout_secs: u64,
}

fn default_threshold() -> u64 {
    DEFAULT_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> u64 {
    5
}

fn default_temp_branch_prefix() -> String {
    DEFAULT_TEMP_BRANCH_PREFIX.to_string()
}

fn default_temp_branch_max_age() -> u64 {
    365
}

fn default_log_retention() -> u64 {
    30
}

fn default_git_timeout() -> u64 {
    60
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            git_profile: None,
            auto_init_git: true,
            check_interval_minutes: default_check_interval(),
            temp_branch_strategy: false,
            temp_branch_prefix: default_temp_branch_prefix(),
            temp_branch_max_age_days: default_temp_branch_max_age(),
            log_retention_days: default_log_retention(),
            untracked_policy: UntrackedPolicy::default(),
            git_timeout_secs: default_git_timeout(),
        }
    }
}

impl GlobalSettings {
    /// The identity profile with `~` expanded.
    pub fn git_profile_path(&self) -> Option<PathBuf> {
        self.git_profile.as_deref().map(expand_home)
    }

    pub fn git_timeout(&self) -> Option<Duration> {
        (self.git_timeout_secs > 0).then(|| Duration::from_secs(self.git_timeout_secs))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate settings for logical consistency.
///
/// # Validation Rules
///
/// - `default_threshold` must be positive
/// - `check_interval_minutes` must be positive
/// - `temp_branch_prefix` must be a usable branch name component
pub fn validate_settings(settings: &GlobalSettings) -> Result<()> {
    if settings.default_threshold == 0 {
        return Err(CommitwatchError::InvalidThreshold(0));
    }
    if settings.check_interval_minutes == 0 {
        return Err(CommitwatchError::Config(
            "check_interval_minutes must be at least 1".to_string(),
        ));
    }
    let prefix = settings.temp_branch_prefix.trim();
    if prefix.is_empty()
        || prefix.contains(char::is_whitespace)
        || prefix.contains("..")
        || prefix.starts_with('-')
        || prefix.ends_with('/')
    {
        return Err(CommitwatchError::Config(format!(
            "Invalid temp_branch_prefix '{}'",
            settings.temp_branch_prefix
        )));
    }
    Ok(())
}

/// Keys accepted by `config set`.
pub const VALID_KEYS: &[&str] = &[
    "default_threshold",
    "git_profile",
    "auto_init_git",
    "check_interval_minutes",
    "temp_branch_strategy",
    "temp_branch_prefix",
    "temp_branch_max_age_days",
    "log_retention_days",
    "untracked_policy",
    "git_timeout_secs",
];

/// Set one setting from its textual form, then validate the result.
///
/// An empty value for `git_profile` clears it. A relative profile is stored
/// resolved against the current directory, since git only accepts absolute
/// includes on the command line.
pub fn set_setting(settings: &mut GlobalSettings, key: &str, value: &str) -> Result<()> {
    let mut updated = settings.clone();
    match key {
        "default_threshold" => updated.default_threshold = parse_u64(key, value)?,
        "git_profile" => {
            let value = value.trim();
            updated.git_profile = if value.is_empty() {
                None
            } else {
                Some(normalize_path(&expand_home(Path::new(value)))?)
            };
        }
        "auto_init_git" => updated.auto_init_git = parse_bool(key, value)?,
        "check_interval_minutes" => updated.check_interval_minutes = parse_u64(key, value)?,
        "temp_branch_strategy" => updated.temp_branch_strategy = parse_bool(key, value)?,
        "temp_branch_prefix" => updated.temp_branch_prefix = value.trim().to_string(),
        "temp_branch_max_age_days" => updated.temp_branch_max_age_days = parse_u64(key, value)?,
        "log_retention_days" => updated.log_retention_days = parse_u64(key, value)?,
        "untracked_policy" => updated.untracked_policy = value.trim().parse()?,
        "git_timeout_secs" => updated.git_timeout_secs = parse_u64(key, value)?,
        _ => {
            return Err(CommitwatchError::Config(format!(
                "Unknown key '{}'. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }
    validate_settings(&updated)?;
    *settings = updated;
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(CommitwatchError::Config(format!(
            "Invalid value '{}' for '{}': expected true or false",
            value, key
        ))),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        CommitwatchError::Config(format!(
            "Invalid value '{}' for '{}': expected a non-negative integer",
            value, key
        ))
    })
}

/// Render settings as TOML for display.
pub fn settings_to_toml(settings: &GlobalSettings) -> Result<String> {
    toml::to_string(settings).map_err(|e| CommitwatchError::Config(e.to_string()))
}

// ============================================================================
// Paths
// ============================================================================

/// Get the commitwatch config directory.
///
/// `$COMMITWATCH_HOME` wins when set; otherwise `~/.config/commitwatch/`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        CommitwatchError::Config("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the config directory exists, returning it.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = GlobalSettings::default();
        assert!(validate_settings(&settings).is_ok());
        assert_eq!(settings.default_threshold, 30);
        assert!(settings.auto_init_git);
        assert!(!settings.temp_branch_strategy);
        assert_eq!(settings.untracked_policy, UntrackedPolicy::Informational);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{"default_threshold": 120}"#).unwrap();
        assert_eq!(settings.default_threshold, 120);
        assert_eq!(settings.temp_branch_prefix, "commitwatch-auto");
        assert_eq!(settings.check_interval_minutes, 5);
        assert!(settings.git_profile.is_none());
    }

    #[test]
    fn test_untracked_policy_serializes_kebab_case() {
        let json = serde_json::to_string(&UntrackedPolicy::CountLines).unwrap();
        assert_eq!(json, "\"count-lines\"");
        let parsed: UntrackedPolicy = "informational".parse().unwrap();
        assert_eq!(parsed, UntrackedPolicy::Informational);
        assert!("sometimes".parse::<UntrackedPolicy>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let settings = GlobalSettings {
            default_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(CommitwatchError::InvalidThreshold(0))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        for prefix in ["", "  ", "has space", "a..b", "-lead", "trail/"] {
            let settings = GlobalSettings {
                temp_branch_prefix: prefix.to_string(),
                ..Default::default()
            };
            assert!(validate_settings(&settings).is_err(), "prefix {prefix:?}");
        }
    }

    #[test]
    fn test_set_setting_parses_typed_values() {
        let mut settings = GlobalSettings::default();
        set_setting(&mut settings, "default_threshold", "75").unwrap();
        set_setting(&mut settings, "temp_branch_strategy", "yes").unwrap();
        set_setting(&mut settings, "untracked_policy", "count-lines").unwrap();
        set_setting(&mut settings, "git_profile", "~/.gitconfig-work").unwrap();

        assert_eq!(settings.default_threshold, 75);
        assert!(settings.temp_branch_strategy);
        assert_eq!(settings.untracked_policy, UntrackedPolicy::CountLines);
        assert_eq!(
            settings.git_profile,
            Some(normalize_path(&expand_home(Path::new("~/.gitconfig-work"))).unwrap())
        );

        set_setting(&mut settings, "git_profile", "").unwrap();
        assert!(settings.git_profile.is_none());
    }

    #[test]
    fn test_relative_git_profile_is_stored_absolute() {
        let mut settings = GlobalSettings::default();
        set_setting(&mut settings, "git_profile", "profiles/../work.gitconfig").unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(settings.git_profile, Some(cwd.join("work.gitconfig")));
    }

    #[test]
    fn test_set_setting_leaves_settings_untouched_on_error() {
        let mut settings = GlobalSettings::default();
        assert!(set_setting(&mut settings, "default_threshold", "0").is_err());
        assert!(set_setting(&mut settings, "auto_init_git", "maybe").is_err());
        assert!(set_setting(&mut settings, "no_such_key", "1").is_err());
        assert_eq!(settings, GlobalSettings::default());
    }

    #[test]
    fn test_git_timeout_zero_disables_limit() {
        let settings = GlobalSettings {
            git_timeout_secs: 0,
            ..Default::default()
        };
        assert!(settings.git_timeout().is_none());
        assert_eq!(
            GlobalSettings::default().git_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_settings_to_toml_contains_keys() {
        let rendered = settings_to_toml(&GlobalSettings::default()).unwrap();
        assert!(rendered.contains("default_threshold = 30"));
        assert!(rendered.contains("untracked_policy = \"informational\""));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        let p = PathBuf::from("/etc/gitconfig");
        assert_eq!(expand_home(&p), p);
    }
}
