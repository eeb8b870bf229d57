//! loan-cloud — membership loan ledger service
//!
//! Long-running service that:
//! - Enforces per-tier monthly item, swap and items-out allowances
//! - Runs checkout, return and swap as single transactions
//! - Takes loan photos into object storage
//! - Syncs subscription state from Shopify webhooks

mod api;
mod config;
mod db;
mod error;
mod idempotency;
mod ledger;
mod shopify;
mod state;
mod storage;
mod validation;

use std::time::Duration;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How often expired idempotency entries are purged
const IDEMPOTENCY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting loan-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Periodic idempotency cache purge
    let idempotency = state.idempotency.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(IDEMPOTENCY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = idempotency.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired idempotency entries");
            }
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("loan-cloud HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("loan-cloud stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
