// =============================================================================
// StockLens — Main Entry Point
// =============================================================================
//
// Loads configuration, builds the shared state and the configured market-data
// provider, then runs the API server and the daily refresh loop until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stocklens::api::rest::{self, ApiContext};
use stocklens::app_state::AppState;
use stocklens::providers;
use stocklens::runtime_config::RuntimeConfig;
use stocklens::scheduler;

const CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("StockLens starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override tracked codes from env if available.
    if let Ok(codes) = std::env::var("STOCKLENS_CODES") {
        config.codes = codes
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if config.codes.is_empty() {
        config.codes = vec!["SH600036".into(), "SH601318".into(), "SZ000858".into()];
    }

    info!(codes = ?config.codes, provider = %config.provider, "Configured instruments");

    // ── 2. Build shared state & provider ─────────────────────────────────
    let provider = providers::build(&config);
    let state = Arc::new(AppState::new(config));

    // ── 3. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("STOCKLENS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let ctx = ApiContext {
        state: state.clone(),
        provider: provider.clone(),
    };
    let bind_addr_clone = bind_addr.clone();

    tokio::spawn(async move {
        let app = rest::router(ctx);
        let listener = tokio::net::TcpListener::bind(&bind_addr_clone)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr_clone, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    // ── 4. Daily refresh loop ────────────────────────────────────────────
    let refresh_state = state.clone();
    let refresh_provider = provider.clone();
    tokio::spawn(async move {
        scheduler::run_refresh_loop(refresh_state, refresh_provider).await;
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("StockLens shut down complete.");
    Ok(())
}
