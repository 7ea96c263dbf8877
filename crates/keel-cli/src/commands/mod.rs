//! Command implementations for the Keel CLI.
//!
//! - [`build`] - Compile entries and write artifacts
//! - [`dev`] - Development server with proxy forwarding
//! - [`check`] - Configuration validation
//! - [`resolve`] - Alias and proxy route inspection
//!
//! Each command provides an `execute` function that takes the parsed
//! command arguments and returns a Result.

pub mod build;
pub mod check;
pub mod dev;
pub mod resolve;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
pub use resolve::execute as resolve_execute;
