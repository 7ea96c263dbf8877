//! Terminal UI utilities for status messages and formatted output.
//!
//! # Examples
//!
//! ```no_run
//! use keel_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Build successful");
//! ui::error("Failed to read keel.toml");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Initialize color support based on environment.
///
/// Should be called early in `main`. `--no-color` always wins.
pub fn init_colors(no_color: bool) {
    owo_colors::set_override(!no_color && should_use_color());
}
