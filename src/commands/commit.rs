//! Forced commits and temp branch handlers.

use crate::error::Result;
use crate::monitor::Monitor;
use crate::output::{
    print_commit_outcome, print_info, print_squash_summary, print_success, print_temp_branches,
};
use std::path::Path;

use super::resolve_path;

/// Commit a directory's pending edits now.
pub fn commit_command(monitor: &Monitor, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    let outcome = monitor.force_commit(&path)?;
    print_commit_outcome(&path, &outcome);
    Ok(())
}

/// Fold the temp branch into its origin with `message`.
pub fn squash_command(monitor: &Monitor, path: Option<&Path>, message: &str) -> Result<()> {
    let path = resolve_path(path)?;
    print_squash_summary(&monitor.squash(&path, message)?);
    Ok(())
}

pub fn branches_command(monitor: &Monitor, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    print_temp_branches(&monitor.temp_branches(&path)?);
    Ok(())
}

/// Delete temp branches older than `days` (or the configured maximum age).
pub fn cleanup_command(monitor: &Monitor, path: Option<&Path>, days: Option<u64>) -> Result<()> {
    let path = resolve_path(path)?;
    let deleted = monitor.cleanup(&path, days)?;
    if deleted.is_empty() {
        print_info("No stale temp branches");
        return Ok(());
    }
    for name in &deleted {
        print_success(&format!("Deleted {}", name));
    }
    Ok(())
}
