//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{Result, SkiAmiError};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_auth_config(&settings.auth)?;
    validate_logging_config(&settings.logging)?;
    validate_rate_limit_config(&settings.rate_limit)?;

    Ok(())
}

/// Validate HTTP server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(SkiAmiError::Config("Server host is required".to_string()));
    }

    if config.port == 0 {
        return Err(SkiAmiError::Config(
            "Server port must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SkiAmiError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(SkiAmiError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(SkiAmiError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SkiAmiError::Config("Redis URL is required".to_string()));
    }

    if config.ttl_seconds == 0 {
        return Err(SkiAmiError::Config(
            "Redis TTL must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate token verification configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < 32 {
        return Err(SkiAmiError::Config(
            "JWT secret must be at least 32 characters".to_string(),
        ));
    }

    if let Some(ref audience) = config.audience {
        if audience.is_empty() {
            return Err(SkiAmiError::Config(
                "JWT audience cannot be empty when set".to_string(),
            ));
        }
    }

    if let Some(ref issuer) = config.issuer {
        if issuer.is_empty() {
            return Err(SkiAmiError::Config(
                "JWT issuer cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(SkiAmiError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(SkiAmiError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    let valid_formats = ["pretty", "json"];
    if !valid_formats.contains(&config.format.as_str()) {
        return Err(SkiAmiError::Config(format!(
            "Invalid log format: {}. Valid formats: {:?}",
            config.format, valid_formats
        )));
    }

    if config.file_enabled && config.file_path.is_empty() {
        return Err(SkiAmiError::Config(
            "Log file path is required when file logging is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validate rate limiting configuration
fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.max_requests == 0 {
        return Err(SkiAmiError::Config(
            "Rate limit max requests must be greater than 0".to_string(),
        ));
    }

    if config.window_seconds == 0 {
        return Err(SkiAmiError::Config(
            "Rate limit window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "0123456789abcdef0123456789abcdef".to_string();
        settings
    }

    #[test]
    fn test_default_settings_with_secret_pass_validation() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_short_jwt_secret_is_rejected() {
        let mut settings = valid_settings();
        settings.auth.jwt_secret = "too-short".to_string();
        assert!(matches!(
            validate_settings(&settings),
            Err(SkiAmiError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_connection_bounds_are_checked() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        settings.database.max_connections = 10;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_rate_limit_window_is_rejected() {
        let mut settings = valid_settings();
        settings.rate_limit.window_seconds = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
