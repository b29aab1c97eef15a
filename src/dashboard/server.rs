//! Axum server setup for the mirror.
//!
//! Routes, CORS middleware and graceful shutdown for the locally served
//! dashboard. The mirror binds loopback by default; it is a presentation
//! surface, not part of the trading backend.

use crate::dashboard::handlers::{
    api_events, api_status, backtest_page, health_check, index_page, strategy_command,
};
use crate::dashboard::state::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Mirror server configuration
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Enable CORS for development
    pub enable_cors: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            host: "127.0.0.1".to_string(),
            enable_cors: true,
        }
    }
}

impl MirrorConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("MIRROR_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8081),
            host: std::env::var("MIRROR_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            enable_cors: std::env::var("MIRROR_CORS")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(true),
        }
    }
}

/// Mirror server
pub struct MirrorServer {
    state: Arc<AppState>,
    config: MirrorConfig,
}

impl MirrorServer {
    /// Create a new mirror server with default configuration
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            config: MirrorConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(state: Arc<AppState>, config: MirrorConfig) -> Self {
        Self { state, config }
    }

    /// Build the router with all routes
    fn build_router(&self) -> Router {
        let cors = if self.config.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        } else {
            CorsLayer::new()
        };

        Router::new()
            // Rendered pages
            .route("/", get(index_page))
            .route("/backtest", get(backtest_page))
            // Control relay
            .route("/strategy/{name}", post(strategy_command))
            // API
            .route("/api/status", get(api_status))
            .route("/events", get(api_events))
            // Health check
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("[MIRROR] Dashboard ready at http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("[MIRROR] Server shut down");
        Ok(())
    }
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::sample_report;
    use crate::control::ControlClient;
    use crate::dashboard::state::MonitorState;

    #[test]
    fn default_config_binds_loopback() {
        let config = MirrorConfig::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_cors);
    }

    #[tokio::test]
    async fn router_builds() {
        let state = Arc::new(AppState {
            monitor: MonitorState::new(),
            control: ControlClient::new("http://127.0.0.1:8000/api"),
            backtest: sample_report(),
        });
        let server = MirrorServer::new(state);
        let _router = server.build_router();
        // Router should build without panicking
    }
}
