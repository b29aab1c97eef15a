//! Environment-driven configuration.
//!
//! Defaults match the original hub deployment: backend REST under
//! `http://127.0.0.1:8000/api`, status feed at `ws://127.0.0.1:8000/ws/status`,
//! backtest artifact at `backtest_results/results.json`.

use std::path::PathBuf;

/// Top-level monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base URL of the backend control/status API (no trailing slash).
    pub api_base: String,
    /// WebSocket URL of the status feed.
    pub feed_url: String,
    /// Path to the backtest results artifact.
    pub backtest_results: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000/api".to_string(),
            feed_url: "ws://127.0.0.1:8000/ws/status".to_string(),
            backtest_results: PathBuf::from("backtest_results/results.json"),
        }
    }
}

impl MonitorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("HUB_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            feed_url: std::env::var("HUB_FEED_URL").unwrap_or(defaults.feed_url),
            backtest_results: std::env::var("HUB_BACKTEST_RESULTS")
                .map(PathBuf::from)
                .unwrap_or(defaults.backtest_results),
        }
    }

    /// URL of the one-shot status document used at bootstrap.
    pub fn status_url(&self) -> String {
        format!("{}/status", self.api_base)
    }
}
