// =============================================================================
// Flip Engine — Main Entry Point
// =============================================================================
//
// Records the latest item prices on a fixed interval, keeps one analytics
// snapshot per tracked item up to date and serves both over a JSON API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod api;
mod app_state;
mod flips;
mod indicators;
mod ingest;
mod runtime_config;
mod store;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::ingest::{PriceSource, WikiPriceClient};
use crate::runtime_config::RuntimeConfig;
use crate::store::{InMemoryPriceStore, PriceStore, SqlitePriceStore};

const CONFIG_PATH: &str = "runtime_config.json";

/// Open the store selected by `database_url`.
async fn open_store(database_url: &str) -> anyhow::Result<Arc<dyn PriceStore>> {
    if database_url == "memory" {
        warn!("Using in-memory store, history is lost on restart");
        return Ok(Arc::new(InMemoryPriceStore::new()));
    }
    let store = SqlitePriceStore::connect(database_url)
        .await
        .with_context(|| format!("failed to open database {database_url}"))?;
    info!(url = %database_url, "SQLite store ready");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Flip Engine starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    info!(
        tracked = config.tracked_items.len(),
        interval_secs = config.fetch_interval_secs,
        database = %config.database_url,
        "Configuration resolved"
    );

    // ── 2. Store & shared state ──────────────────────────────────────────
    let store = open_store(&config.database_url).await?;
    let source: Arc<dyn PriceSource> = Arc::new(WikiPriceClient::new(
        config.price_api_url.clone(),
        &config.user_agent,
    )?);
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState::new(config, store));

    // ── 3. Ingestion loop ────────────────────────────────────────────────
    tokio::spawn(ingest::run_ingest_loop(state.clone(), source));

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Flip Engine shut down complete.");
    Ok(())
}
