//! Config command handler.
//!
//! Displays and modifies the global settings stored in the registry.

use crate::config::settings_to_toml;
use crate::error::Result;
use crate::output::{print_success, BOLD, GRAY, RESET};
use crate::registry::Registry;

/// Print the effective settings as TOML.
pub fn config_show_command(registry: &Registry) -> Result<()> {
    let settings = registry.settings()?;
    println!("{BOLD}# Global settings{RESET}");
    println!("{GRAY}# {}{RESET}", registry.path().display());
    println!();
    print!("{}", settings_to_toml(&settings)?);
    Ok(())
}

/// Set one setting, validating the value before anything is written.
pub fn config_set_command(registry: &Registry, key: &str, value: &str) -> Result<()> {
    registry.set_setting(key, value)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}
