//! HTTP handlers module
//!
//! This module contains all API handlers organized by resource, plus the
//! router assembly. Every route under /api/v1 requires a bearer token; the
//! health endpoint is public.

pub mod groups;
pub mod health;
pub mod profile;
pub mod transport;
pub mod trips;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::middleware::auth::auth_middleware;
use crate::middleware::logging::track_requests;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::{JwtVerifier, RateLimiter};
use crate::services::ServiceFactory;

/// Build the application router with all routes and middleware wired up.
/// The rate limiter is passed in so the caller can keep a handle for
/// periodic cleanup.
pub fn build_router(
    services: ServiceFactory,
    settings: &Settings,
    rate_limiter: RateLimiter,
) -> Router {
    let verifier = Arc::new(JwtVerifier::new(&settings.auth));

    let public_routes = Router::new().route("/health", get(health::health_check));

    let protected_routes = Router::new()
        .route(
            "/api/v1/profile",
            get(profile::get_profile).put(profile::upsert_profile),
        )
        .route(
            "/api/v1/trips",
            post(trips::create_trip).get(trips::list_trips),
        )
        .route(
            "/api/v1/trips/{trip_id}",
            get(trips::get_trip).patch(trips::update_trip),
        )
        .route(
            "/api/v1/trips/{trip_id}/members",
            post(trips::add_member).get(trips::list_members),
        )
        .route(
            "/api/v1/trips/{trip_id}/groups",
            post(groups::create_group).get(groups::list_groups),
        )
        .route("/api/v1/groups/{group_id}", get(groups::get_group))
        .route(
            "/api/v1/groups/{group_id}/members",
            post(groups::join_group)
                .delete(groups::leave_group)
                .get(groups::list_members),
        )
        .route(
            "/api/v1/groups/{group_id}/transport",
            get(transport::get_transport_view),
        )
        .route(
            "/api/v1/groups/{group_id}/transport/preference",
            put(transport::set_preference),
        )
        .route(
            "/api/v1/groups/{group_id}/cars",
            post(transport::register_car),
        )
        .route(
            "/api/v1/groups/{group_id}/cars/{car_id}",
            delete(transport::deactivate_car),
        )
        .route(
            "/api/v1/groups/{group_id}/cars/{car_id}/join",
            post(transport::join_car),
        )
        .route(
            "/api/v1/groups/{group_id}/cars/{car_id}/leave",
            post(transport::leave_car),
        )
        // Auth runs before the rate limiter, which keys on the member
        .layer(from_fn(rate_limit_middleware))
        .layer(from_fn(auth_middleware))
        .layer(Extension(verifier))
        .layer(Extension(rate_limiter));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(services))
        .layer(from_fn(track_requests))
        .layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins = &settings.server.cors_allowed_origins;

    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
