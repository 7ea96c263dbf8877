//! Development server command implementation.
//!
//! Builds once into memory, then serves the result and proxies matching
//! requests until Ctrl+C.

use std::net::SocketAddr;

use crate::build::compile;
use crate::cli::DevArgs;
use crate::dev::{BundleCache, DevServer, DevState};
use crate::error::{CliError, Result};
use crate::project::{LoadOptions, Overrides, ServerOverrides, load_project};
use crate::ui;

/// Execute the dev command.
///
/// # Errors
///
/// Returns errors for invalid configuration, a failed initial build or an
/// address that cannot be bound. Backend failures while serving are answered
/// with 502 and never stop the server.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let overrides = Overrides {
        server: ServerOverrides {
            host: args.host.clone(),
            port: args.port,
        },
        ..Overrides::default()
    };
    let project = load_project(
        &args.project,
        LoadOptions {
            default_profile: "development",
            overrides,
            check_entries: true,
        },
    )?;
    let config = project.resolved;

    let output = match compile(&config) {
        Ok(output) => output,
        Err(e) => {
            ui::error(&format!("Initial build failed: {e}"));
            return Err(e);
        }
    };
    let cache = BundleCache::from_build(&output, config.base());
    ui::info(&format!("Cached {} files in memory", cache.len()));

    for rule in config.proxy().rules() {
        ui::info(&format!("Proxy {} -> {}", rule.pattern().as_str(), rule.target()));
    }

    let addr = socket_addr(config.host(), config.port())?;
    let state = DevState::new(config.proxy().clone(), cache).shared();

    ui::success(&format!("Development server running at http://{addr}{}", config.base()));
    ui::info("Press Ctrl+C to stop");

    DevServer::new(state).start(addr, shutdown_signal()).await
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    format!("{host}:{port}")
        .parse::<SocketAddr>()
        .or_else(|_| format!("[{host}]:{port}").parse::<SocketAddr>())
        .map_err(|_| CliError::InvalidArgument(format!("invalid server address {host}:{port}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    ui::info("Shutting down development server...");
}
