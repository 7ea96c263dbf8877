//! Build command implementation.

use std::time::Instant;

use crate::build::{ArtifactEmitter, compile};
use crate::cli::BuildArgs;
use crate::error::Result;
use crate::project::{BuildOverrides, LoadOptions, Overrides, load_project};
use crate::ui;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load configuration (file > profile > `KEEL_*` env > flags)
/// 2. Compile every entry in memory
/// 3. Purge the output directory if enabled
/// 4. Write artifacts, source maps and the manifest
/// 5. Display build summary
///
/// Compilation happens before the purge, so a missing variable leaves the
/// previous output untouched.
///
/// # Errors
///
/// Returns errors for invalid configuration, missing entry points,
/// unresolved variables and write failures.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();

    ui::info("Loading configuration...");
    let overrides = flag_overrides(&args);
    let project = load_project(
        &args.project,
        LoadOptions {
            default_profile: "production",
            overrides,
            check_entries: true,
        },
    )?;
    let config = &project.resolved;
    let plan = config.output();

    ui::info(&format!(
        "Building {} entr{} ({} mode)",
        plan.targets.len(),
        if plan.targets.len() == 1 { "y" } else { "ies" },
        config.mode()
    ));

    let output = compile(config)?;

    if plan.purge_before_build {
        ui::info(&format!("Cleaning output directory: {}", plan.out_dir.display()));
    }
    let report = ArtifactEmitter::new().emit(plan, &output)?;

    let summary: Vec<(String, String, u64)> = output
        .artifacts
        .iter()
        .map(|artifact| {
            let size = report
                .written
                .iter()
                .find(|(path, _)| path.ends_with(&artifact.file_name))
                .map_or(0, |(_, size)| *size);
            (artifact.entry.clone(), artifact.file_name.clone(), size)
        })
        .collect();

    let elapsed = start_time.elapsed();
    ui::print_build_summary(&summary, elapsed);
    ui::success(&format!(
        "Build completed in {} -> {}",
        ui::format_duration(elapsed),
        plan.out_dir.display()
    ));

    Ok(())
}

fn flag_overrides(args: &BuildArgs) -> Overrides {
    Overrides {
        build: BuildOverrides {
            out_dir: args.out_dir.clone(),
            empty_out_dir: args.no_empty_out_dir.then_some(false),
            sourcemap: args.sourcemap.then_some(true),
            hash: args.hash.then_some(true),
        },
        ..Overrides::default()
    }
}
