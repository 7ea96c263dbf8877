//! Error handling for the Keel CLI.
//!
//! `CliError` is the top-level type returned by commands. Configuration
//! failures arrive as `keel_config::ConfigError` and are wrapped unchanged;
//! build failures get their own `BuildError` with a hint for the user.
//!
//! # Example
//!
//! ```rust,no_run
//! use keel_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_entry(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod miette;

use std::path::PathBuf;
use thiserror::Error;

pub use keel_config::ConfigError;

pub use self::miette::{build_error_to_miette, cli_error_to_miette};

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading, validation or resolution failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build process errors (missing entry points, write failures, etc.)
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or overrides
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Build process errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Entry point file doesn't exist or cannot be read
    #[error("Entry point not found: {}\n\nHint: Check build.entries in your config", .0.display())]
    EntryNotFound(PathBuf),

    /// Failed to write an artifact; files written in this run were removed
    #[error("Failed to write asset: {0}\n\nHint: Check output directory permissions")]
    AssetWriteFailed(String),

    /// Environment or define substitution failed for an entry
    #[error("Failed to compile entry '{entry}': {source}")]
    Substitution {
        entry: String,
        #[source]
        source: ConfigError,
    },

    /// Entry source is not valid UTF-8 text
    #[error("Entry '{entry}' is not valid UTF-8: {}", .path.display())]
    InvalidSource { entry: String, path: PathBuf },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into `CliError::FileNotFound` for `path`,
    /// including one raised while reading a config file.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) | CliError::Config(ConfigError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{err}\n\nHint: {hint}"))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{msg}: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_entry_not_found() {
        let err = BuildError::EntryNotFound(PathBuf::from("src/main.js"));
        let msg = err.to_string();
        assert!(msg.contains("Entry point not found"));
        assert!(msg.contains("src/main.js"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn substitution_error_names_entry_and_variable() {
        let err = BuildError::Substitution {
            entry: "main".into(),
            source: ConfigError::UnresolvedVariable {
                name: "SECRET_TOKEN".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("'main'"));
        assert!(msg.contains("SECRET_TOKEN"));
    }

    #[test]
    fn cli_error_from_config_error() {
        let cli_err: CliError = ConfigError::NoEntries.into();
        assert!(matches!(cli_err, CliError::Config(ConfigError::NoEntries)));
    }

    #[test]
    fn result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/proj/keel.toml").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));

        let err = keel_config::load_file(std::path::Path::new("/definitely/missing/keel.toml"))
            .with_path("/definitely/missing/keel.toml")
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn result_ext_with_hint_and_context() {
        let result: std::result::Result<(), ConfigError> = Err(ConfigError::NotFound);
        let msg = result.with_hint("Create keel.toml").unwrap_err().to_string();
        assert!(msg.contains("Hint: Create keel.toml"));

        let result: std::result::Result<(), ConfigError> = Err(ConfigError::NotFound);
        let msg = result.context("Failed to load project").unwrap_err().to_string();
        assert!(msg.starts_with("Failed to load project"));
    }
}
