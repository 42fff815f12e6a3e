//! Basic message output functions.

use super::colors::*;
use crate::error::CommitwatchError;

/// Print an error message.
pub fn print_error(msg: &str) {
    println!("{RED}{BOLD}Error:{RESET} {}", msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{GREEN}✓{RESET} {}", msg);
}

/// Print a failed command's error with its kind, plus a recovery hint where one exists.
pub fn print_command_error(err: &CommitwatchError) {
    print_error(&err.to_string());
    println!("{GRAY}  kind: {}{RESET}", err.kind());
    if let Some(hint) = hint_for(err) {
        println!();
        println!("{}", hint);
    }
}

fn hint_for(err: &CommitwatchError) -> Option<String> {
    match err {
        CommitwatchError::NotTracked(path) => Some(format!(
            "Run '{CYAN}git init{RESET}' in {} or enable '{CYAN}commitwatch config set auto_init_git true{RESET}'.",
            path.display()
        )),
        CommitwatchError::NotMonitored(path) => Some(format!(
            "Run '{CYAN}commitwatch add {}{RESET}' to start monitoring it.",
            path.display()
        )),
        CommitwatchError::ConcurrentAccess(_) => {
            Some("Another commitwatch process is running; try again shortly.".to_string())
        }
        CommitwatchError::RegistryCorrupt { path, .. } => Some(format!(
            "No valid backup was found next to {}. Inspect or restore it by hand.",
            path.display()
        )),
        _ => None,
    }
}
