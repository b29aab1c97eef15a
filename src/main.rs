//! Trading Hub Monitor
//!
//! Live strategy monitor and backtest viewer for the AlgoTrading hub.
//! Connects to the backend's WebSocket status feed (reconnecting forever on
//! a fixed delay), forwards start/stop commands to the REST control
//! endpoint, and serves the rendered dashboard from a local mirror port.

mod backtest;
mod config;
mod control;
mod dashboard;
mod model;
mod render;
mod sync;

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use config::MonitorConfig;
use control::ControlClient;
use dashboard::{AppState, MirrorConfig, MirrorServer, MonitorState};
use sync::LiveSyncClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tradehub_monitor=info".parse().unwrap()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = MonitorConfig::from_env();
    let mirror_config = MirrorConfig::from_env();

    info!("Trading Hub Monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("   Backend API: {}", config.api_base);
    info!("   Status feed: {}", config.feed_url);

    // =========================================================================
    // 1. LOAD BACKTEST RESULTS (sample fallback keeps the view populated)
    // =========================================================================
    let backtest_report = backtest::load_or_sample(&config.backtest_results);

    // =========================================================================
    // 2. SHARED STATE AND CLIENTS
    // =========================================================================
    let monitor = MonitorState::new();
    let app_state = Arc::new(AppState {
        monitor: monitor.clone(),
        control: ControlClient::new(config.api_base.clone()),
        backtest: backtest_report,
    });

    // =========================================================================
    // 3. LIVE SYNC: bootstrap fetch in parallel with the feed loop
    // =========================================================================
    let sync_client = Arc::new(LiveSyncClient::new(&config, monitor.clone()));

    let bootstrap_client = sync_client.clone();
    tokio::spawn(async move {
        bootstrap_client.bootstrap().await;
    });

    let feed_client = sync_client.clone();
    let feed_handle = tokio::spawn(async move {
        feed_client.run().await;
    });

    // =========================================================================
    // 4. MIRROR SERVER
    // =========================================================================
    let server = MirrorServer::with_config(app_state, mirror_config);
    let mirror_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("[MIRROR] Server error: {}", e);
        }
    });

    info!("All systems operational");

    tokio::select! {
        _ = feed_handle => {
            error!("Feed sync loop exited unexpectedly");
        }
        _ = mirror_handle => {
            info!("Mirror server stopped, shutting down");
        }
    }

    Ok(())
}
