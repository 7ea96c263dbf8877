//! Error types for configuration loading, validation and resolution.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Config parsing/loading errors
    #[error("config not found")]
    NotFound,

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid config value for '{field}'{}", hint_suffix(.hint))]
    InvalidValue { field: String, hint: Option<String> },

    #[error("invalid profile override: {message}")]
    InvalidProfileOverride { message: String },

    #[error("profile '{0}' not found in config")]
    ProfileNotFound(String),

    // Schema validation errors (no filesystem checks)
    #[error("no entries specified")]
    NoEntries,

    #[error("malformed alias rule #{index}: {message}")]
    MalformedAlias { index: usize, message: String },

    #[error("malformed proxy rule '{pattern}': {message}")]
    MalformedProxy { pattern: String, message: String },

    #[error("duplicate entry point '{0}'")]
    DuplicateEntry(String),

    #[error("invalid entry name '{0}': use letters, digits, '_', '-' or '.'")]
    InvalidEntryName(String),

    #[error("entry path not found: {}", .path.display())]
    EntryNotFound { path: PathBuf },

    #[error(
        "output directory {} is not inside project root {}",
        .out_dir.display(),
        .root.display()
    )]
    InvalidOutputDirectory { out_dir: PathBuf, root: PathBuf },

    // Resolution errors
    #[error("unresolved environment variable '{name}' (not present in the build snapshot)")]
    UnresolvedVariable { name: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(": {hint}"),
        None => String::new(),
    }
}

impl ConfigError {
    /// Whether this error was raised while loading or validating configuration,
    /// as opposed to during a build.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, ConfigError::UnresolvedVariable { .. } | ConfigError::Io(_))
    }
}
