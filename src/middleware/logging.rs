//! Request logging middleware
//!
//! Logs every request with its method, route, status and duration, and
//! flags slow requests. Route templates are logged instead of raw paths to
//! keep identifiers out of the logs.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

const SLOW_REQUEST_MS: u128 = 1000;

/// Middleware logging request outcomes
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();

    if response.status().is_server_error() {
        warn!(method = %method, path = %path, status = status, duration_ms = duration_ms, "Request failed");
    } else {
        info!(method = %method, path = %path, status = status, duration_ms = duration_ms, "Request completed");
    }

    if duration_ms > SLOW_REQUEST_MS {
        warn!(method = %method, path = %path, duration_ms = duration_ms, "Slow request detected");
    }

    response
}
