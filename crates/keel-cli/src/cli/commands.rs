use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available Keel subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every entry point into the output directory
    ///
    /// Loads the configuration, captures the environment snapshot, purges the
    /// output directory (unless disabled) and writes one artifact per entry
    /// plus manifest.json.
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Serves the in-memory build under `base` and forwards requests that
    /// match a proxy rule to its backend.
    Dev(DevArgs),

    /// Validate configuration without building
    ///
    /// Runs the full configuration load, including entry existence checks,
    /// and reports what would be built.
    Check(CheckArgs),

    /// Show how import specifiers and request paths resolve
    Resolve(ResolveArgs),
}

/// Options shared by every command that loads a project.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Directory to search for keel.toml, keel.json or package.json
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Explicit config file (overrides discovery)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile overlay to apply (e.g. development, production)
    ///
    /// Defaults to `production` for build/check/resolve and `development`
    /// for dev, applied only when the config declares it.
    #[arg(short, long, env = "KEEL_PROFILE", value_name = "NAME")]
    pub profile: Option<String>,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output directory, relative to the project root
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Emit source maps next to each artifact
    #[arg(long)]
    pub sourcemap: bool,

    /// Include a content hash in artifact file names
    #[arg(long)]
    pub hash: bool,

    /// Keep existing files in the output directory
    #[arg(long)]
    pub no_empty_out_dir: bool,
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Port to listen on
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Import specifiers to run through the alias table
    #[arg(value_name = "SPECIFIER")]
    pub specifiers: Vec<String>,

    /// Request paths to run through the proxy table
    #[arg(long = "route", value_name = "PATH")]
    pub routes: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}
