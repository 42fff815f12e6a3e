//! Terminal output formatting for commitwatch.
//!
//! Diagnostics go through `tracing` to stderr; everything the user asked to
//! see is printed from here. Functions are organized by domain:
//!
//! - [`messages`] - Error, warning, info and success lines
//! - [`status`] - Directory listings, check results and temp branches
//! - [`commit`] - Commit and squash results

pub mod commit;
pub mod messages;
pub mod status;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use commit::{print_commit_outcome, print_squash_summary};
pub use messages::{print_command_error, print_error, print_info, print_success, print_warning};
pub use status::{
    format_state, print_directory_list, print_directory_status, print_exclusions,
    print_pass_results, print_temp_branches,
};
