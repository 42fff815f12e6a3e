//! Commit and squash results.

use crate::branch::SquashSummary;
use crate::commit::CommitOutcome;
use std::path::Path;

use super::colors::*;

/// Print the result of a forced commit.
pub fn print_commit_outcome(path: &Path, outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::Committed(summary) => {
            println!(
                "{GREEN}✓{RESET} Committed {CYAN}{}{RESET} in {}",
                summary.commit,
                path.display()
            );
            if let Some(branch) = &summary.branch {
                println!("  {BLUE}Branch:{RESET}  {}", branch);
            }
            println!(
                "  {BLUE}Changes:{RESET} {GREEN}+{}{RESET} {RED}-{}{RESET} ({} total) in {} file{}",
                summary.lines_added,
                summary.lines_deleted,
                summary.total_changed,
                summary.files_changed,
                if summary.files_changed == 1 { "" } else { "s" }
            );
            if summary.untracked_files > 0 {
                println!(
                    "  {BLUE}New:{RESET}     {} previously untracked file{}",
                    summary.untracked_files,
                    if summary.untracked_files == 1 { "" } else { "s" }
                );
            }
        }
        CommitOutcome::NothingToCommit => {
            println!("{GRAY}Nothing to commit in {}{RESET}", path.display());
        }
        CommitOutcome::DirtyState(reason) => {
            println!(
                "{YELLOW}Skipped:{RESET} {} ({}). Finish or abort it first.",
                path.display(),
                reason
            );
        }
        CommitOutcome::Failed(message) => {
            println!("{RED}{BOLD}Commit failed:{RESET} {}", message);
        }
    }
}

/// Print the result of a squash.
pub fn print_squash_summary(summary: &SquashSummary) {
    println!(
        "{GREEN}✓{RESET} Squashed {} commit{} from {CYAN}{}{RESET} into {BOLD}{}{RESET} as {CYAN}{}{RESET}",
        summary.commits_squashed,
        if summary.commits_squashed == 1 { "" } else { "s" },
        summary.branch,
        summary.origin,
        summary.commit
    );
    println!("{GRAY}  Temp branch deleted.{RESET}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitSummary;

    #[test]
    fn test_print_commit_outcome_smoke() {
        let path = Path::new("/w/app");
        print_commit_outcome(
            path,
            &CommitOutcome::Committed(CommitSummary {
                commit: "abc1234".to_string(),
                branch: None,
                lines_added: 1,
                lines_deleted: 0,
                total_changed: 1,
                files_changed: 1,
                untracked_files: 0,
            }),
        );
        print_commit_outcome(path, &CommitOutcome::NothingToCommit);
        print_commit_outcome(path, &CommitOutcome::DirtyState("merge in progress".to_string()));
        print_commit_outcome(path, &CommitOutcome::Failed("index.lock exists".to_string()));
    }
}
