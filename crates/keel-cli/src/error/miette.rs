//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError, ConfigError};
use ::miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => {
            let label = if e.is_configuration_error() {
                "Configuration error"
            } else {
                "Failed to load project"
            };
            match config_hint(&e) {
                Some(help) => ::miette::miette!(help = help, "{}: {}", label, e),
                None => ::miette::miette!("{}: {}", label, e),
            }
        }
        _ => ::miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::Substitution { entry, source } => ::miette::miette!(
            help = "Add the variable to env.keys, define it in .env, or remove the reference",
            "Failed to compile entry '{}': {}",
            entry,
            source
        ),
        _ => ::miette::miette!("{}", err),
    }
}

fn config_hint(err: &ConfigError) -> Option<&'static str> {
    match err {
        ConfigError::NotFound => {
            Some("Create keel.toml or keel.json, add a 'keel' field to package.json, or pass --config")
        }
        ConfigError::NoEntries => Some("Declare at least one entry under [build.entries]"),
        ConfigError::InvalidOutputDirectory { .. } => {
            Some("build.outDir must resolve to a subdirectory of the project root")
        }
        ConfigError::ProfileNotFound(_) => Some("Declare the profile under [profiles.<name>]"),
        ConfigError::UnsupportedVersion { .. } => Some("Set version = 1"),
        _ => None,
    }
}
