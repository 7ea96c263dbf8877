//! Keel CLI - build orchestration and development proxy.
//!
//! This crate provides the command-line interface on top of `keel-config`:
//! loading the project configuration, emitting build artifacts and running
//! the development server.
//!
//! # Architecture
//!
//! - [`error`] - CLI error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Status messages and formatted output
//! - [`project`] - Layered configuration loading (file, env, flags)
//! - [`build`] - Compiling entries and writing artifacts
//! - [`dev`] - Development server and proxy forwarding
//! - `commands` - Individual CLI command implementations
//!
//! # Example
//!
//! ```rust
//! use keel_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // CLI command implementations...
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod project;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, CliError, Result, ResultExt};
