//! Live synchronization client for the backend status feed.
//!
//! Owns the one WebSocket connection to the hub's status push endpoint and
//! keeps [`MonitorState`] current: every accepted snapshot replaces the stored
//! one, every connection transition updates the indicator. On close or
//! transport error the client waits a fixed delay and reconnects, forever —
//! no backoff growth, no retry cap. A reconnect always creates a fresh
//! connection; handles are never reused.
//!
//! Malformed payloads are dropped and counted; they never reach the view.

use crate::config::MonitorConfig;
use crate::dashboard::state::MonitorState;
use crate::model::{ConnectionState, DashboardSnapshot};
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Fixed delay between a disconnect and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Client that keeps the monitor state in sync with the backend.
pub struct LiveSyncClient {
    feed_url: String,
    status_url: String,
    http: reqwest::Client,
    state: Arc<MonitorState>,
}

impl LiveSyncClient {
    pub fn new(config: &MonitorConfig, state: Arc<MonitorState>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            feed_url: config.feed_url.clone(),
            status_url: config.status_url(),
            http,
            state,
        }
    }

    /// One-shot status fetch so the view is populated before the first push
    /// arrives. Runs concurrently with the feed; failure is logged and
    /// non-fatal — the feed remains the primary path. A response that lands
    /// after the feed has already delivered a snapshot is discarded, so a
    /// slow fetch never replaces newer push data.
    pub async fn bootstrap(&self) {
        debug!("[SYNC] Bootstrap fetch from {}", self.status_url);
        match self.http.get(&self.status_url).send().await {
            Ok(resp) => match resp.json::<DashboardSnapshot>().await {
                Ok(snapshot) => {
                    if self.state.snapshots_received.load(Ordering::Relaxed) > 0 {
                        debug!("[SYNC] Bootstrap snapshot discarded, feed already live");
                        return;
                    }
                    info!(
                        "[SYNC] Bootstrap snapshot loaded ({} strategies)",
                        snapshot.strategies.len()
                    );
                    self.state.apply_snapshot(snapshot).await;
                }
                Err(e) => warn!("[SYNC] Bootstrap snapshot unparseable: {}", e),
            },
            Err(e) => warn!("[SYNC] Bootstrap fetch failed: {}", e),
        }
    }

    /// Run the feed loop forever. Each pass opens one connection, drains it
    /// until close or error, then schedules exactly one retry after the
    /// fixed delay.
    pub async fn run(&self) {
        loop {
            self.state.set_connection(ConnectionState::Connecting).await;
            info!("[SYNC] Connecting to {}", self.feed_url);

            match connect_async(self.feed_url.as_str()).await {
                Ok((ws, _)) => {
                    self.state.set_connection(ConnectionState::Connected).await;
                    let (_write, mut read) = ws.split();

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => self.handle_payload(&text).await,
                            Ok(Message::Close(_)) => {
                                info!("[SYNC] Feed closed by backend");
                                break;
                            }
                            Ok(_) => {} // ping/pong/binary: nothing to do
                            Err(e) => {
                                // Errors close the channel and take the
                                // normal disconnect path.
                                warn!("[SYNC] Feed read error: {}", e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("[SYNC] Connect failed: {}", e);
                }
            }

            self.state
                .set_connection(ConnectionState::Disconnected)
                .await;
            sleep(RECONNECT_DELAY).await;
        }
    }

    /// Parse one feed payload. Parse failures are logged and counted only;
    /// the last good snapshot stays rendered.
    async fn handle_payload(&self, text: &str) {
        match serde_json::from_str::<DashboardSnapshot>(text) {
            Ok(snapshot) => {
                debug!(
                    "[SYNC] Snapshot applied ({} strategies, global P&L {:.2})",
                    snapshot.strategies.len(),
                    snapshot.global_pnl
                );
                self.state.apply_snapshot(snapshot).await;
            }
            Err(e) => {
                warn!("[SYNC] Dropping unparseable payload: {}", e);
                self.state.note_parse_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::state::MonitorEvent;
    use futures::SinkExt;
    use std::sync::atomic::Ordering;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;

    fn config_for(addr: std::net::SocketAddr) -> MonitorConfig {
        MonitorConfig {
            api_base: format!("http://{}/api", addr),
            feed_url: format!("ws://{}/ws/status", addr),
            backtest_results: "results.json".into(),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_touching_state() {
        let state = MonitorState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LiveSyncClient::new(&config_for(addr), state.clone());

        client.handle_payload("{\"global_pnl\": 5.0, \"strategies\": {}}").await;
        client.handle_payload("not json at all").await;
        client.handle_payload("[1, 2, 3]").await;

        assert_eq!(state.snapshots_received.load(Ordering::Relaxed), 1);
        assert_eq!(state.parse_failures.load(Ordering::Relaxed), 2);
        assert_eq!(state.latest_snapshot().await.unwrap().global_pnl, 5.0);
    }

    #[tokio::test]
    async fn bootstrap_failure_is_nonfatal() {
        let state = MonitorState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LiveSyncClient::new(&config_for(addr), state.clone());
        client.bootstrap().await;

        assert!(state.latest_snapshot().await.is_none());
        assert_eq!(state.snapshots_received.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn late_bootstrap_does_not_replace_feed_snapshot() {
        let state = MonitorState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Status endpoint that answers with a stale document.
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut seen = Vec::new();
            loop {
                let n = stream.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let body = r#"{"global_pnl": 1.0, "strategies": {}}"#;
            let resp = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
        });

        let client = LiveSyncClient::new(&config_for(addr), state.clone());

        // The feed delivers before the status response lands.
        client.handle_payload(r#"{"global_pnl": 99.0, "strategies": {}}"#).await;
        let log_rows = state.signal_log_len().await;
        client.bootstrap().await;

        assert_eq!(state.latest_snapshot().await.unwrap().global_pnl, 99.0);
        assert_eq!(state.snapshots_received.load(Ordering::Relaxed), 1);
        assert_eq!(state.signal_log_len().await, log_rows);
    }

    #[tokio::test]
    async fn feed_snapshot_is_applied_and_close_disconnects() {
        let state = MonitorState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // One-shot feed: accept, push a snapshot, then close.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                r#"{"global_pnl": 42.0, "strategies": {"Survivor": {"status": "Running"}}}"#
                    .to_string(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        });

        let client = LiveSyncClient::new(&config_for(addr), state.clone());
        let mut rx = state.subscribe();
        let handle = tokio::spawn(async move { client.run().await });

        // Expect Connected, then the snapshot, then Disconnected.
        let mut saw_connected = false;
        let mut saw_snapshot = false;
        let mut saw_disconnected = false;
        while !(saw_connected && saw_snapshot && saw_disconnected) {
            match timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
                Ok(MonitorEvent::Connection(ConnectionState::Connected)) => {
                    saw_connected = true
                }
                Ok(MonitorEvent::Snapshot(snap)) => {
                    assert_eq!(snap.global_pnl, 42.0);
                    saw_snapshot = true;
                }
                Ok(MonitorEvent::Connection(ConnectionState::Disconnected)) => {
                    saw_disconnected = true
                }
                Ok(_) => {}
                Err(e) => panic!("event channel error: {}", e),
            }
        }

        assert!(state.latest_snapshot().await.is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn reconnect_waits_the_fixed_delay() {
        let state = MonitorState::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accepts: Arc<std::sync::Mutex<Vec<Instant>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let accepts_srv = accepts.clone();

        // Refuse the handshake: accept the TCP connection and drop it, so
        // every attempt ends in the disconnect path.
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                accepts_srv.lock().unwrap().push(Instant::now());
                drop(stream);
            }
        });

        let client = LiveSyncClient::new(&config_for(addr), state.clone());
        let handle = tokio::spawn(async move { client.run().await });

        sleep(Duration::from_millis(4700)).await;
        handle.abort();

        let times = accepts.lock().unwrap();
        // First attempt immediately, second after the 2000 ms delay; no
        // duplicate timers means no third attempt sneaks in early.
        assert!(times.len() >= 2, "expected at least one reconnect");
        assert!(times.len() <= 3, "too many reconnects: {}", times.len());
        for pair in times.windows(2) {
            assert!(
                pair[1] - pair[0] >= RECONNECT_DELAY,
                "reconnect fired before the fixed delay"
            );
        }
        assert_eq!(state.connection().await, ConnectionState::Disconnected);
    }
}
