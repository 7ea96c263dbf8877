//! Command-line interface definition for Keel.
//!
//! # Command Structure
//!
//! - `keel build` - Resolve configuration and write artifacts to the output directory
//! - `keel dev` - Serve the in-memory build and proxy matching requests to a backend
//! - `keel check` - Validate configuration without building
//! - `keel resolve` - Show how specifiers, routes and entries resolve

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, DevArgs, ProjectArgs, ResolveArgs};

/// Keel - build orchestration and development proxy
#[derive(Parser, Debug)]
#[command(
    name = "keel",
    version,
    about = "Build orchestration and development proxy for frontend projects",
    long_about = "Keel resolves a single project configuration into import aliases, named\n\
                  entry points, an environment snapshot, an output plan and dev proxy rules,\n\
                  then builds or serves the project from it."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
