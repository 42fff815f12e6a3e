//! commitwatch CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use commitwatch::commands::{
    add_command, branches_command, cleanup_command, commit_command, config_set_command,
    config_show_command, exclude_command, exclusions_command, list_command, remove_command,
    run_command, squash_command, status_command, unexclude_command, watch_command,
};
use commitwatch::logging;
use commitwatch::monitor::Monitor;
use commitwatch::output::messages::print_command_error;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commitwatch")]
#[command(
    version,
    about = "Watch git working trees and commit automatically once edits pass a size threshold",
    after_help = "EXAMPLES:
    # Monitor the current directory, committing after 50 changed lines
    commitwatch add -t 50

    # Check every monitored directory once (run this from cron or a timer)
    commitwatch run

    # Or keep checking every check_interval_minutes until Ctrl+C
    commitwatch watch

    # Keep auto-commits off the main line, then fold them into one commit
    commitwatch config set temp_branch_strategy true
    commitwatch squash -m \"Implement feature X\""
)]
struct Cli {
    /// Show debug logs on stderr (COMMITWATCH_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring a directory, or update its threshold and name
    #[command(after_help = "EXAMPLES:
    commitwatch add                         # Current directory, default threshold
    commitwatch add ~/code/app -t 100 -n App
    commitwatch add --profile ~/.gitconfig-work

Directories that are not git repositories are initialized when
auto_init_git is enabled (the default).")]
    Add {
        /// Directory to monitor (defaults to the current directory)
        path: Option<PathBuf>,

        /// Changed lines (added + deleted) that trigger a commit
        #[arg(short, long)]
        threshold: Option<u64>,

        /// Friendly name shown in listings
        #[arg(short, long)]
        name: Option<String>,

        /// Git config file with the identity to commit as in this directory
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Stop monitoring a directory
    Remove {
        path: Option<PathBuf>,
    },

    /// List monitored directories
    List,

    /// Exclude a directory and everything below it from monitoring
    Exclude {
        path: Option<PathBuf>,
    },

    /// Remove an exclusion
    Unexclude {
        path: Option<PathBuf>,
    },

    /// List excluded directories
    Exclusions,

    /// Show how a directory's pending edits compare to its threshold
    Status {
        #[arg(conflicts_with = "all")]
        path: Option<PathBuf>,

        /// Show every monitored directory (never commits)
        #[arg(short, long)]
        all: bool,
    },

    /// Check every monitored directory once, committing those over threshold
    Run,

    /// Keep running checks every check_interval_minutes until Ctrl+C
    Watch,

    /// Commit a directory's pending edits now, regardless of threshold
    Commit {
        path: Option<PathBuf>,
    },

    /// Squash the directory's temp branch into its origin branch
    Squash {
        /// Message for the squashed commit
        #[arg(short, long)]
        message: String,

        path: Option<PathBuf>,
    },

    /// List the temp branches of a repository
    Branches {
        path: Option<PathBuf>,
    },

    /// Delete temp branches whose last commit is older than the cutoff
    Cleanup {
        path: Option<PathBuf>,

        /// Age in days (defaults to temp_branch_max_age_days)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Show or change global settings
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the settings as TOML
    Show,

    /// Set one setting
    #[command(after_help = "KEYS:
    default_threshold, git_profile, auto_init_git, check_interval_minutes,
    temp_branch_strategy, temp_branch_prefix, temp_branch_max_age_days,
    log_retention_days, untracked_policy, git_timeout_secs

EXAMPLES:
    commitwatch config set default_threshold 50
    commitwatch config set untracked_policy count-lines
    commitwatch config set git_profile ~/.gitconfig-work")]
    Set { key: String, value: String },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let monitor = match Monitor::open_default() {
        Ok(m) => m,
        Err(e) => {
            print_command_error(&e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Add {
            path,
            threshold,
            name,
            profile,
        } => add_command(
            &monitor,
            path.as_deref(),
            *threshold,
            name.as_deref(),
            profile.clone(),
        ),
        Commands::Remove { path } => remove_command(&monitor, path.as_deref()),
        Commands::List => list_command(&monitor),
        Commands::Exclude { path } => exclude_command(&monitor, path.as_deref()),
        Commands::Unexclude { path } => unexclude_command(&monitor, path.as_deref()),
        Commands::Exclusions => exclusions_command(&monitor),
        Commands::Status { path, all } => status_command(&monitor, path.as_deref(), *all),
        Commands::Run => run_command(&monitor),
        Commands::Watch => watch_command(&monitor),
        Commands::Commit { path } => commit_command(&monitor, path.as_deref()),
        Commands::Squash { message, path } => squash_command(&monitor, path.as_deref(), message),
        Commands::Branches { path } => branches_command(&monitor, path.as_deref()),
        Commands::Cleanup { path, days } => cleanup_command(&monitor, path.as_deref(), *days),
        Commands::Config { subcommand } => match subcommand {
            None | Some(ConfigSubcommand::Show) => config_show_command(monitor.registry()),
            Some(ConfigSubcommand::Set { key, value }) => {
                config_set_command(monitor.registry(), key, value)
            }
        },
    };

    if let Err(e) = result {
        print_command_error(&e);
        std::process::exit(1);
    }
}
