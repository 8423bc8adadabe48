//! Error handling for SkiAmi
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy, including the mapping of
//! errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for SkiAmi application
#[derive(Error, Debug)]
pub enum SkiAmiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Profile not found: {profile_id}")]
    ProfileNotFound { profile_id: Uuid },

    #[error("Trip not found: {trip_id}")]
    TripNotFound { trip_id: Uuid },

    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: Uuid },

    #[error("Car not found: {car_id}")]
    CarNotFound { car_id: Uuid },

    #[error("Member {profile_id} not found in group {group_id}")]
    MemberNotFound { profile_id: Uuid, group_id: Uuid },

    #[error("Member {profile_id} already holds a seat in group {group_id}")]
    AlreadyAssigned { profile_id: Uuid, group_id: Uuid },

    #[error("Car {car_id} is full (capacity {capacity})")]
    CarFull { car_id: Uuid, capacity: i32 },

    #[error("Member {profile_id} holds no seat in car {car_id}")]
    NotAssigned { profile_id: Uuid, car_id: Uuid },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for SkiAmi operations
pub type Result<T> = std::result::Result<T, SkiAmiError>;

impl SkiAmiError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            SkiAmiError::Database(_) => false,
            SkiAmiError::Migration(_) => false,
            SkiAmiError::Config(_) => false,
            SkiAmiError::PermissionDenied(_) => false,
            SkiAmiError::ProfileNotFound { .. } => false,
            SkiAmiError::TripNotFound { .. } => false,
            SkiAmiError::GroupNotFound { .. } => false,
            SkiAmiError::CarNotFound { .. } => false,
            SkiAmiError::MemberNotFound { .. } => false,
            SkiAmiError::AlreadyAssigned { .. } => false,
            SkiAmiError::CarFull { .. } => false,
            SkiAmiError::NotAssigned { .. } => false,
            SkiAmiError::Redis(_) => true,
            SkiAmiError::Serialization(_) => false,
            SkiAmiError::Io(_) => true,
            SkiAmiError::UrlParse(_) => false,
            SkiAmiError::Authentication(_) => false,
            SkiAmiError::RateLimitExceeded => true,
            SkiAmiError::Validation(_) => false,
            SkiAmiError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SkiAmiError::Database(_) => ErrorSeverity::Critical,
            SkiAmiError::Migration(_) => ErrorSeverity::Critical,
            SkiAmiError::Config(_) => ErrorSeverity::Critical,
            SkiAmiError::PermissionDenied(_) => ErrorSeverity::Warning,
            SkiAmiError::Authentication(_) => ErrorSeverity::Warning,
            SkiAmiError::RateLimitExceeded => ErrorSeverity::Warning,
            SkiAmiError::Validation(_) => ErrorSeverity::Info,
            SkiAmiError::AlreadyAssigned { .. } => ErrorSeverity::Info,
            SkiAmiError::CarFull { .. } => ErrorSeverity::Info,
            SkiAmiError::NotAssigned { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Stable machine-readable error kind used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            SkiAmiError::Validation(_) | SkiAmiError::UrlParse(_) => "validation_error",
            SkiAmiError::AlreadyAssigned { .. } => "already_assigned",
            SkiAmiError::CarFull { .. } => "car_full",
            SkiAmiError::NotAssigned { .. } => "not_assigned",
            SkiAmiError::ProfileNotFound { .. }
            | SkiAmiError::TripNotFound { .. }
            | SkiAmiError::GroupNotFound { .. }
            | SkiAmiError::CarNotFound { .. }
            | SkiAmiError::MemberNotFound { .. } => "not_found",
            SkiAmiError::PermissionDenied(_) => "permission_denied",
            SkiAmiError::Authentication(_) => "authentication_error",
            SkiAmiError::RateLimitExceeded => "rate_limit_exceeded",
            SkiAmiError::ServiceUnavailable(_) | SkiAmiError::Redis(_) => "service_unavailable",
            _ => "internal_error",
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            SkiAmiError::Validation(_) | SkiAmiError::UrlParse(_) => StatusCode::BAD_REQUEST,
            SkiAmiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            SkiAmiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            SkiAmiError::ProfileNotFound { .. }
            | SkiAmiError::TripNotFound { .. }
            | SkiAmiError::GroupNotFound { .. }
            | SkiAmiError::CarNotFound { .. }
            | SkiAmiError::MemberNotFound { .. } => StatusCode::NOT_FOUND,
            SkiAmiError::AlreadyAssigned { .. }
            | SkiAmiError::CarFull { .. }
            | SkiAmiError::NotAssigned { .. } => StatusCode::CONFLICT,
            SkiAmiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            SkiAmiError::ServiceUnavailable(_) | SkiAmiError::Redis(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body returned for failed requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for SkiAmiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal detail stays in the logs; callers get a generic message.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, severity = %self.severity(), "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
