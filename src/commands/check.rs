//! Status, single-pass and continuous monitoring handlers.

use crate::error::Result;
use crate::monitor::Monitor;
use crate::output::{print_directory_status, print_pass_results, GRAY, RESET};
use crate::signal::SignalHandler;
use chrono::Local;
use std::path::Path;

use super::resolve_path;

/// Show how a directory classifies right now, without committing.
///
/// With `all`, every monitored directory is classified instead.
pub fn status_command(monitor: &Monitor, path: Option<&Path>, all: bool) -> Result<()> {
    if all {
        print_pass_results(&monitor.inspect_all()?);
        return Ok(());
    }
    let path = resolve_path(path)?;
    print_directory_status(&monitor.inspect(&path)?);
    Ok(())
}

/// Run one monitoring pass over every registered directory.
pub fn run_command(monitor: &Monitor) -> Result<()> {
    print_pass_results(&monitor.run_cycle()?);
    Ok(())
}

/// Repeat monitoring passes until Ctrl+C.
pub fn watch_command(monitor: &Monitor) -> Result<()> {
    let signal = SignalHandler::new()?;
    let interval = monitor.registry().settings()?.check_interval_minutes;
    println!(
        "{GRAY}Watching every {} minute{}. Press Ctrl+C to stop.{RESET}",
        interval,
        if interval == 1 { "" } else { "s" }
    );

    let passes = monitor.watch(&signal, |results| {
        println!();
        println!("{GRAY}[{}]{RESET}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        print_pass_results(results);
    })?;

    println!();
    println!(
        "{GRAY}Stopped after {} pass{}.{RESET}",
        passes,
        if passes == 1 { "" } else { "es" }
    );
    Ok(())
}
