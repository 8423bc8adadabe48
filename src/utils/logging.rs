//! Logging configuration and setup
//!
//! This module provides logging initialization for the SkiAmi application:
//! an env-filtered stdout subscriber in pretty or JSON format, with an
//! optional daily-rolling log file.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Guard keeping the file appender's background worker alive. Must be held
/// for the lifetime of the program.
pub type LogGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

/// Initialize logging based on configuration. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = if config.format == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file_layer, guard) = if config.file_enabled {
        let file_appender = tracing_appender::rolling::daily(&config.file_path, "skiami.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!(level = %config.level, format = %config.format, "Logging initialized");
    Ok(guard)
}
