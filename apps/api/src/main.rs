//! # rxdesk API server
//!
//! Loads configuration, opens the SQLite database (running migrations),
//! creates the bootstrap admin if needed and serves the REST API until
//! Ctrl+C / SIGTERM.

use rxdesk_api::{bootstrap_admin, build_router, ApiConfig, AppState};
use rxdesk_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rxdesk=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting rxdesk API server...");

    let config = ApiConfig::load()?;
    info!(
        addr = %config.bind_addr,
        db = %config.database_path,
        utc_offset = %config.business_clock.offset(),
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("RXDESK_JWT_SECRET is not set; using the development secret");
    }

    let db = Database::new(
        DbConfig::new(&config.database_path)
            .max_connections(config.db_max_connections)
            .business_clock(config.business_clock),
    )
    .await?;
    info!("Database ready");

    if bootstrap_admin(&db, &config).await? {
        info!("Bootstrap admin account created");
    }

    let addr = config.bind_addr;
    let app = build_router(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
