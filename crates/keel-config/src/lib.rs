//! Configuration model for the Keel build tool.
//!
//! A project declares import aliases, named entry points, an environment
//! capture policy, an output directory and development proxy rules in one
//! versioned file. [`ResolvedConfig::load`] turns that declaration into the
//! read-only runtime pieces the build and dev server consume.

pub mod alias;
pub mod config;
pub mod discovery;
pub mod entries;
pub mod env;
pub mod error;
pub mod output;
pub mod proxy;
pub mod resolved;
pub mod validation;

// Re-export main types
pub use alias::*;
pub use config::*;
pub use entries::*;
pub use env::*;
pub use error::*;
pub use output::*;
pub use proxy::*;
pub use resolved::*;

// Re-export discovery and validation
pub use discovery::{CONFIG_FILES, ConfigDiscovery, load_file};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator};
