//! Forwarding matched requests to a backend.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use keel_config::ProxyRule;

/// Send `request` to the backend named by `rule` and relay its response.
///
/// Method and body are forwarded unchanged. A backend that cannot be reached
/// yields `502 Bad Gateway`.
pub async fn forward(
    client: &Client<HttpConnector, Body>,
    rule: &ProxyRule,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = rule.forward_uri(path_and_query);

    parts.uri = match target.parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(target = %target, error = %e, "invalid backend uri");
            return (StatusCode::BAD_GATEWAY, "Invalid backend URI").into_response();
        }
    };

    let has_origin = parts.headers.contains_key(header::ORIGIN);
    for (name, value) in rule.rewrite_headers(has_origin) {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                parts.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid proxy header"),
        }
    }

    let method = parts.method.clone();
    tracing::debug!(method = %method, uri = %parts.uri, "forwarding request");

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::warn!(method = %method, target = %target, error = %e, "backend unreachable");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
