//! Development server: proxy rules first, then the in-memory build.

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use keel_config::RouteDecision;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::dev::{SharedState, proxy};
use crate::error::{CliError, Result, ResultExt};

pub struct DevServer {
    state: SharedState,
}

impl DevServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// The axum application. Every request goes through a single fallback
    /// handler so proxy patterns can match any path.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(handle_request)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error carrying a `--port` hint when the address cannot be
    /// bound.
    pub async fn start<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {addr}: {e}")))
            .with_hint("Pick another port with --port or stop the process using it")?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(address = %local, rules = self.state.router.rules().len(), "dev server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")))?;

        tracing::info!("dev server stopped");
        Ok(())
    }
}

async fn handle_request(State(state): State<SharedState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    match state.router.route(&path, request.method().as_str()) {
        RouteDecision::Forward(rule) => proxy::forward(&state.client, rule, request).await,
        RouteDecision::Local => serve_local(&state, &path),
    }
}

fn serve_local(state: &SharedState, path: &str) -> Response {
    match state.cache.get(path) {
        Some((content, content_type)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(content.to_vec()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        None => {
            tracing::debug!(path, "not found");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}
