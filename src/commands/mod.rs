//! CLI command handlers for commitwatch.
//!
//! Each handler takes already parsed arguments, calls into [`Monitor`] or
//! [`Registry`](crate::registry::Registry) and prints the result.
//!
//! # Commands
//!
//! - [`directories`] - add, remove, list
//! - [`exclusions`] - exclude, unexclude, exclusions
//! - [`check`] - status, run, watch
//! - [`commit`] - commit, squash, branches, cleanup
//! - [`config`] - config show, config set
//!
//! [`Monitor`]: crate::monitor::Monitor

mod check;
mod commit;
mod config;
mod directories;
mod exclusions;

pub use check::{run_command, status_command, watch_command};
pub use commit::{branches_command, cleanup_command, commit_command, squash_command};
pub use config::{config_set_command, config_show_command};
pub use directories::{add_command, list_command, remove_command};
pub use exclusions::{exclude_command, exclusions_command, unexclude_command};

use crate::error::Result;
use crate::fsutil::normalize_path;
use std::path::{Path, PathBuf};

/// Resolve a path argument, defaulting to the current directory.
pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    normalize_path(path.unwrap_or_else(|| Path::new(".")))
}
