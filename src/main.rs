// PumpDump Prediction Market - Main Entry Point

use anyhow::Context;
use tracing::{error, info};

use pumpdump_prediction_market::app_state::{AppState, SharedState};
use pumpdump_prediction_market::config::Config;
use pumpdump_prediction_market::routes::{router, ENDPOINTS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    config.logging.init();

    info!("🎲 PumpDump Prediction Market starting");

    let state: SharedState = AppState::new(&config).shared();

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, owner = %config.owner, "🚀 server running");
    for (method, path, about) in ENDPOINTS {
        info!("   {:<5} {:<34} {}", method, path, about);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("🛑 shutdown signal received, saving state");
    let app_state = shutdown_state.lock();
    if let Err(e) = app_state.save_to_disk() {
        error!(error = %e, "failed to save state");
    }
    info!("👋 goodbye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
}
