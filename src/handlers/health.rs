//! Health check handler

use axum::{http::StatusCode, Extension, Json};
use serde::Serialize;

use crate::services::ServiceFactory;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    database_healthy: bool,
    cache_healthy: bool,
    issues: Vec<String>,
}

/// Report service health; 503 when a required backing store is down
pub async fn health_check(
    Extension(services): Extension<ServiceFactory>,
) -> (StatusCode, Json<HealthResponse>) {
    let health = services.health_check().await;

    let (code, status) = if health.is_healthy() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database_healthy: health.database_healthy,
            cache_healthy: health.cache_healthy,
            issues: health.get_issues(),
        }),
    )
}
