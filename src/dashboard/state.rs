//! Shared monitor state for the mirror server.
//!
//! Holds the latest snapshot received from the backend, the live-channel
//! connection state, the append-only signal log and diagnostic counters.
//! All of it is written by the sync client and read by the handlers; the
//! rendered view is always a pure function of what is stored here.

use crate::model::{ConnectionState, DashboardSnapshot};
use crate::render::SignalLog;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Event types broadcast to SSE subscribers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A new snapshot was accepted and applied.
    Snapshot(DashboardSnapshot),
    /// The live channel changed state.
    Connection(ConnectionState),
}

/// Shared monitor state.
pub struct MonitorState {
    /// Most recently accepted snapshot, replaced wholesale on every update.
    snapshot: RwLock<Option<DashboardSnapshot>>,

    /// Live-channel connection state.
    connection: RwLock<ConnectionState>,

    /// Append-only signal log.
    signal_log: RwLock<SignalLog>,

    /// Count of accepted snapshots.
    pub snapshots_received: AtomicU64,

    /// Count of payloads dropped for failing to parse.
    pub parse_failures: AtomicU64,

    /// Broadcast channel for SSE events.
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl MonitorState {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            snapshot: RwLock::new(None),
            connection: RwLock::new(ConnectionState::Connecting),
            signal_log: RwLock::new(SignalLog::new()),
            snapshots_received: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            event_tx,
        })
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all SSE subscribers.
    pub fn broadcast(&self, event: MonitorEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    /// Apply an accepted snapshot: replace the stored one, append to the
    /// signal log and notify subscribers.
    pub async fn apply_snapshot(&self, snapshot: DashboardSnapshot) {
        self.signal_log.write().await.record(&snapshot);
        *self.snapshot.write().await = Some(snapshot.clone());
        self.snapshots_received.fetch_add(1, Ordering::Relaxed);
        self.broadcast(MonitorEvent::Snapshot(snapshot));
    }

    /// Record a payload that failed to parse. The last good snapshot stays
    /// untouched.
    pub fn note_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the connection state and notify subscribers.
    pub async fn set_connection(&self, state: ConnectionState) {
        let mut current = self.connection.write().await;
        if *current != state {
            info!("[SYNC] Connection state: {} -> {}", *current, state);
            *current = state;
            drop(current);
            self.broadcast(MonitorEvent::Connection(state));
        }
    }

    /// Latest accepted snapshot, if any arrived yet.
    pub async fn latest_snapshot(&self) -> Option<DashboardSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Current connection state.
    pub async fn connection(&self) -> ConnectionState {
        *self.connection.read().await
    }

    /// Number of rows currently in the signal log.
    pub async fn signal_log_len(&self) -> usize {
        self.signal_log.read().await.len()
    }

    /// Render the full live page from the current state.
    pub async fn render_live_page(&self) -> String {
        let snapshot = self.snapshot.read().await;
        let connection = *self.connection.read().await;
        let log = self.signal_log.read().await;
        crate::render::render_live_page(snapshot.as_ref(), connection, &log)
    }
}

/// Everything the mirror's handlers need: live monitor state, the control
/// client, and the backtest report loaded at startup.
pub struct AppState {
    pub monitor: Arc<MonitorState>,
    pub control: crate::control::ControlClient,
    pub backtest: crate::model::BacktestReport,
}
