//! Directory registration handlers.

use crate::error::Result;
use crate::monitor::Monitor;
use crate::output::{print_directory_list, print_info, print_success, BLUE, RESET};
use std::path::{Path, PathBuf};

use super::resolve_path;

/// Start monitoring a directory, or update its policy.
pub fn add_command(
    monitor: &Monitor,
    path: Option<&Path>,
    threshold: Option<u64>,
    name: Option<&str>,
    profile: Option<PathBuf>,
) -> Result<()> {
    let path = resolve_path(path)?;
    let policy = monitor.add(&path, threshold, name)?;
    if let Some(profile) = profile {
        let profile = resolve_path(Some(&profile))?;
        monitor
            .registry()
            .set_directory_profile(&path, Some(profile))?;
    }

    print_success(&format!("Monitoring {}", path.display()));
    println!("  {BLUE}Name:{RESET}      {}", policy.name);
    println!("  {BLUE}Threshold:{RESET} {} lines", policy.threshold);
    Ok(())
}

/// Stop monitoring a directory. Exclusions are untouched.
pub fn remove_command(monitor: &Monitor, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    if monitor.remove(&path)? {
        print_success(&format!("Stopped monitoring {}", path.display()));
    } else {
        print_info(&format!("{} was not being monitored", path.display()));
    }
    Ok(())
}

/// List monitored directories, flagging missing ones.
pub fn list_command(monitor: &Monitor) -> Result<()> {
    print_directory_list(&monitor.registry().list()?);
    Ok(())
}
