//! Exclusion handlers.

use crate::error::Result;
use crate::monitor::Monitor;
use crate::output::{print_exclusions, print_info, print_success};
use std::path::Path;

use super::resolve_path;

pub fn exclude_command(monitor: &Monitor, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    let outcome = monitor.exclude(&path)?;
    if outcome.added {
        print_success(&format!("Excluded {} and everything below it", path.display()));
    } else {
        print_info(&format!("{} was already excluded", path.display()));
    }
    if outcome.unmonitored {
        print_info("Its monitoring entry was removed");
    }
    Ok(())
}

pub fn unexclude_command(monitor: &Monitor, path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    if monitor.unexclude(&path)? {
        print_success(&format!("{} is no longer excluded", path.display()));
    } else {
        print_info(&format!("{} was not excluded", path.display()));
    }
    Ok(())
}

pub fn exclusions_command(monitor: &Monitor) -> Result<()> {
    print_exclusions(&monitor.registry().load()?.exclusions);
    Ok(())
}
