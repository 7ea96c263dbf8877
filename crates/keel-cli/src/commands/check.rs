//! Check command implementation.
//!
//! Runs the full configuration load without compiling or writing anything.

use crate::cli::CheckArgs;
use crate::error::Result;
use crate::project::{LoadOptions, Overrides, load_project};
use crate::ui;

/// Execute the check command.
///
/// # Errors
///
/// Returns the first configuration error, including entry points whose
/// source file does not exist.
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");

    let project = load_project(
        &args.project,
        LoadOptions {
            default_profile: "production",
            overrides: Overrides::default(),
            check_entries: true,
        },
    )?;
    let config = &project.resolved;

    ui::success(&format!(
        "Configuration is valid: {}",
        project.config_path.display()
    ));

    ui::info(&format!("Mode: {}", config.mode()));
    ui::info(&format!("Root: {}", config.root().display()));
    ui::info(&format!("Output: {}", config.output().out_dir.display()));

    ui::info("Entry points:");
    for entry in config.entries() {
        ui::info(&format!("  {} -> {}", entry.name, entry.source.display()));
    }

    if !config.aliases().rules().is_empty() {
        ui::info("Aliases:");
        for rule in config.aliases().rules() {
            ui::info(&format!("  {} -> {}", rule.find(), rule.replacement()));
        }
    }

    if !config.proxy().is_empty() {
        ui::info("Proxy rules:");
        for rule in config.proxy().rules() {
            ui::info(&format!("  {} -> {}", rule.pattern().as_str(), rule.target()));
        }
    }

    ui::info(&format!("Captured {} environment variables", config.snapshot().len()));

    Ok(())
}
