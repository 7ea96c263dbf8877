//! Logging infrastructure for the Keel CLI.
//!
//! Structured logging on the `tracing` ecosystem with verbosity flags,
//! colored output and `RUST_LOG` overrides.
//!
//! # Example
//!
//! ```rust,no_run
//! use keel_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Starting build");
//! debug!(entry = "main", "Substituting environment");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "keel=debug,keel_cli=debug,keel_config=debug,tower_http=debug";
const QUIET_FILTER: &str = "keel=error,keel_cli=error,keel_config=error";
const DEFAULT_FILTER: &str = "keel=info,keel_cli=info,keel_config=info";

/// Initialize the tracing subscriber with the specified options.
///
/// Should be called once at the start of the program, before any logging.
///
/// # Verbosity Levels
///
/// The logging level is determined in this order:
/// 1. `--verbose` flag: DEBUG for keel crates and request tracing
/// 2. `--quiet` flag: ERROR only
/// 3. `RUST_LOG` environment variable: custom filter
/// 4. Default: INFO for keel crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(select_filter(verbose, quiet), no_color);
}

/// Initialize logger with custom environment filter.
///
/// # Example
///
/// ```rust,no_run
/// use keel_cli::logger::init_logger_with_filter;
/// use tracing_subscriber::EnvFilter;
///
/// let filter = EnvFilter::new("keel=trace,hyper_util=off");
/// init_logger_with_filter(filter, false);
/// ```
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn select_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
