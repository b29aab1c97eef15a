//! Wire data model shared by the live monitor and the backtest viewer.
//!
//! These types mirror the JSON produced by the trading backend: full
//! `DashboardSnapshot` documents on the status feed and `BacktestReport`
//! artifacts written by the backtest engine. Snapshots are always received
//! wholesale; there are no partial or delta updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status reported by the backend for each strategy.
///
/// The backend serializes these capitalized (`"Running"`, `"Stopped"`,
/// `"Error"`); anything else maps to `Unknown` rather than failing the
/// whole snapshot parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum StrategyStatus {
    Running,
    Stopped,
    Error,
    Unknown,
}

impl From<String> for StrategyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Running" => StrategyStatus::Running,
            "Stopped" => StrategyStatus::Stopped,
            "Error" => StrategyStatus::Error,
            _ => StrategyStatus::Unknown,
        }
    }
}

impl Default for StrategyStatus {
    fn default() -> Self {
        StrategyStatus::Stopped
    }
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyStatus::Running => write!(f, "Running"),
            StrategyStatus::Stopped => write!(f, "Stopped"),
            StrategyStatus::Error => write!(f, "Error"),
            StrategyStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

impl StrategyStatus {
    /// True only for an actively running strategy. `Error` and `Unknown`
    /// count as not running, so the Start control stays available.
    pub fn is_running(&self) -> bool {
        matches!(self, StrategyStatus::Running)
    }
}

/// Per-strategy state as reported in each snapshot. Replaced wholesale on
/// every update; the monitor never mutates these fields itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    #[serde(default)]
    pub status: StrategyStatus,
    #[serde(default)]
    pub current_position: Option<String>,
    #[serde(default)]
    pub active_orders: Option<u32>,
    #[serde(default)]
    pub last_signal: Option<String>,
    #[serde(default)]
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub realized_pnl: f64,
    #[serde(default)]
    pub trades_taken: u32,
    #[serde(default)]
    pub open_trades: u32,
    #[serde(default)]
    pub closed_trades: u32,
}

impl StrategyState {
    /// Combined P&L for header aggregation.
    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl
    }
}

/// One complete status payload from the backend.
///
/// `BTreeMap` keeps iteration order deterministic so that rendering the same
/// snapshot twice produces byte-identical output. The `brokers` map is only
/// present on the REST status document, not on feed pushes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub global_pnl: f64,
    #[serde(default)]
    pub brokers: BTreeMap<String, String>,
    #[serde(default)]
    pub strategies: BTreeMap<String, StrategyState>,
}

/// Live-channel connection state, driven only by connection lifecycle
/// events. There is no terminal state; the client retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// One executed trade from a backtest artifact. Timestamps are kept as the
/// strings the engine wrote; the viewer only displays them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: String,
    pub symbol: String,
    pub transaction_type: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Backtest summary document (`results.json` from the backtest engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub total_trades: u32,
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
}
