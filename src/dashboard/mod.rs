//! Local mirror server for the hub dashboard.
//!
//! Serves the rendered live-monitor and backtest views, relays start/stop
//! commands to the backend control endpoint, and pushes Server-Sent Events so
//! the served page refreshes itself when new snapshots arrive. The mirror
//! never owns trading state: everything it shows comes from the latest
//! backend snapshot, and every command it forwards is confirmed only by the
//! next snapshot.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod state;

pub use server::{MirrorConfig, MirrorServer};
pub use state::{AppState, MonitorState};
