//! Directory listings, check results and temp branch display.

use crate::branch::TempBranch;
use crate::evaluate::ChangeState;
use crate::exclusion::ExclusionIndex;
use crate::monitor::{CheckAction, CheckReport, DirectoryStatus};
use crate::registry::MonitoredDirectory;
use crate::stats::{format_file_changes, ChangeStats};
use chrono::{DateTime, Local, Utc};
use std::path::PathBuf;

use super::colors::*;

const FILE_LIST_LIMIT: usize = 5;

/// Colored, fixed-width label for a classification.
pub fn format_state(state: ChangeState) -> String {
    let color = match state {
        ChangeState::Clean => GREEN,
        ChangeState::Below => CYAN,
        ChangeState::Over => YELLOW,
        ChangeState::Dirty => RED,
        ChangeState::NotTracked => GRAY,
    };
    format!("{color}{:<11}{RESET}", state.as_str())
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Print the registered directories.
pub fn print_directory_list(directories: &[(PathBuf, MonitoredDirectory)]) {
    if directories.is_empty() {
        println!("{GRAY}No directories are being monitored.{RESET}");
        println!();
        println!("Run {CYAN}commitwatch add <path>{RESET} to start monitoring one.");
        return;
    }

    println!("{BOLD}Monitored directories:{RESET}");
    println!();
    for (path, dir) in directories {
        let missing = if path.is_dir() {
            String::new()
        } else {
            format!(" {RED}[MISSING]{RESET}")
        };
        println!("  {BOLD}{}{RESET}{}", dir.name, missing);
        println!("    {BLUE}Path:{RESET}       {}", path.display());
        println!("    {BLUE}Threshold:{RESET}  {} lines", dir.threshold);
        println!("    {BLUE}Checked:{RESET}    {}", format_time(dir.last_checked_at));
        if let (Some(at), Some(commit)) = (dir.last_commit_at, &dir.last_commit) {
            println!("    {BLUE}Committed:{RESET}  {} ({CYAN}{}{RESET})", format_time(at), commit);
        }
        if let Some(profile) = &dir.git_profile {
            println!("    {BLUE}Profile:{RESET}    {}", profile.display());
        }
    }
}

/// Print the exclusion list.
pub fn print_exclusions(exclusions: &ExclusionIndex) {
    if exclusions.is_empty() {
        println!("{GRAY}No excluded directories.{RESET}");
        return;
    }
    println!("{BOLD}Excluded directories:{RESET}");
    for (path, entry) in exclusions.iter() {
        println!(
            "  {} {GRAY}(since {}){RESET}",
            path.display(),
            format_time(entry.excluded_at)
        );
    }
}

fn print_stats(stats: &ChangeStats) {
    println!(
        "    {GREEN}+{}{RESET} {RED}-{}{RESET} in {} file{}",
        stats.lines_added,
        stats.lines_deleted,
        stats.files_changed,
        if stats.files_changed == 1 { "" } else { "s" }
    );
    if stats.untracked_file_count > 0 {
        println!(
            "    {GRAY}{} untracked file{} ({} lines){RESET}",
            stats.untracked_file_count,
            if stats.untracked_file_count == 1 { "" } else { "s" },
            stats.untracked_lines
        );
    }
    if !stats.files.is_empty() {
        println!(
            "    {DIM}{}{RESET}",
            format_file_changes(&stats.files, FILE_LIST_LIMIT)
        );
    }
}

/// Print one directory's check result.
pub fn print_directory_status(status: &DirectoryStatus) {
    match &status.report {
        CheckReport::Evaluated {
            state,
            stats,
            action,
        } => {
            println!(
                "{} {BOLD}{}{RESET} {GRAY}{} (threshold {}){RESET}",
                format_state(*state),
                status.name,
                status.path.display(),
                status.threshold
            );
            if !stats.is_clean() {
                print_stats(stats);
            }
            match action {
                CheckAction::None => {}
                CheckAction::Committed(summary) => {
                    let branch = summary
                        .branch
                        .as_deref()
                        .map(|b| format!(" on {}", b))
                        .unwrap_or_default();
                    println!(
                        "    {GREEN}committed{RESET} {CYAN}{}{RESET}{}",
                        summary.commit, branch
                    );
                }
                CheckAction::CommitFailed(message) => {
                    println!("    {RED}commit failed:{RESET} {}", message);
                }
                CheckAction::Skipped(reason) => {
                    println!("    {YELLOW}skipped:{RESET} {}", reason);
                }
            }
        }
        CheckReport::Missing => println!(
            "{RED}{:<11}{RESET} {BOLD}{}{RESET} {GRAY}{}{RESET}",
            "MISSING",
            status.name,
            status.path.display()
        ),
        CheckReport::Excluded(blocking) => println!(
            "{GRAY}{:<11}{RESET} {BOLD}{}{RESET} {GRAY}covered by exclusion {}{RESET}",
            "EXCLUDED",
            status.name,
            blocking.display()
        ),
        CheckReport::Error { kind, message } => println!(
            "{RED}{:<11}{RESET} {BOLD}{}{RESET} {GRAY}{}{RESET}\n    {RED}{}:{RESET} {}",
            "ERROR",
            status.name,
            status.path.display(),
            kind,
            message
        ),
    }
}

/// Print a whole monitoring pass with a one-line summary.
pub fn print_pass_results(results: &[DirectoryStatus]) {
    if results.is_empty() {
        println!("{GRAY}No directories are being monitored.{RESET}");
        return;
    }
    for status in results {
        print_directory_status(status);
    }

    let committed = results.iter().filter(|s| s.committed().is_some()).count();
    let failed = results
        .iter()
        .filter(|s| {
            matches!(
                s.report,
                CheckReport::Error { .. }
                    | CheckReport::Evaluated {
                        action: CheckAction::CommitFailed(_),
                        ..
                    }
            )
        })
        .count();
    println!();
    println!(
        "{BOLD}{}{RESET} checked, {GREEN}{}{RESET} committed, {}{}{RESET} failed",
        results.len(),
        committed,
        if failed > 0 { RED } else { GRAY },
        failed
    );
}

/// Print the temp branches of one repository.
pub fn print_temp_branches(branches: &[TempBranch]) {
    if branches.is_empty() {
        println!("{GRAY}No temp branches.{RESET}");
        return;
    }
    println!("{BOLD}Temp branches:{RESET}");
    for branch in branches {
        let marker = if branch.is_current { "*" } else { " " };
        let ahead = match branch.ahead {
            Some(n) => format!("{} commit{} ahead", n, if n == 1 { "" } else { "s" }),
            None => "origin unknown".to_string(),
        };
        let origin = branch.origin.as_deref().unwrap_or("?");
        let last = branch
            .last_commit
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{GREEN}{}{RESET} {CYAN}{}{RESET} {GRAY}-> {} | {} | last {}{RESET}",
            marker, branch.name, origin, ahead, last
        );
    }
}
