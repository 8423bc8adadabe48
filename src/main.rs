//! SkiAmi backend service
//!
//! Main application entry point

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use SkiAmi::{
    config::Settings,
    database::{connection, DatabaseService},
    handlers,
    middleware::RateLimiter,
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard keeps the file appender alive
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting SkiAmi backend...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = connection::DatabaseConfig::from_settings(&settings.database);
    let db_pool = connection::create_pool(&db_config).await?;

    // Run database migrations
    info!("Running database migrations...");
    connection::run_migrations(&db_pool).await?;

    // Initialize services
    info!("Initializing services...");
    let database_service = DatabaseService::new(db_pool);
    let services = ServiceFactory::new(database_service, &settings)?;

    // Rate limiter with a periodic sweep of idle entries
    let rate_limiter = RateLimiter::new(&settings.rate_limit, settings.features.rate_limit_enabled);
    {
        let sweeper = rate_limiter.clone();
        let sweep_interval = Duration::from_secs(settings.rate_limit.window_seconds.max(60));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                sweeper.cleanup_old_entries();
            }
        });
    }

    let app = handlers::build_router(services, &settings, rate_limiter);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    info!(address = %address, "Binding HTTP server");
    let listener = TcpListener::bind(&address).await?;

    info!("SkiAmi backend is ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SkiAmi backend has been shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
