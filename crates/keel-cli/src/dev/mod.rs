//! Development server.
//!
//! Serves the in-memory build under the configured base path and forwards
//! requests matching a proxy rule to their backend. Proxy rules are checked
//! before local files.

pub mod proxy;
pub mod server;
pub mod state;

pub use server::DevServer;
pub use state::{BundleCache, DevState, SharedState, determine_content_type};
