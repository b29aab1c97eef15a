//! Server-Sent Events for the served live page.
//!
//! Each connected browser gets the current state immediately, then every
//! snapshot and connection transition as it happens, so the page refreshes
//! without polling.

use crate::dashboard::state::{MonitorEvent, MonitorState};
use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Create an SSE stream for a client connection
pub fn create_sse_stream(
    state: Arc<MonitorState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.subscribe();

    let stream = stream! {
        // Send current state on connection
        if let Ok(connection) = serde_json::to_string(&state.connection().await) {
            yield Ok(Event::default()
                .event("connection")
                .data(connection));
        }

        if let Some(snapshot) = state.latest_snapshot().await {
            if let Ok(json) = serde_json::to_string(&snapshot) {
                yield Ok(Event::default()
                    .event("snapshot")
                    .data(json));
            }
        }

        // Stream events from broadcast channel
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let (event_type, data) = match &event {
                        MonitorEvent::Snapshot(snapshot) => {
                            ("snapshot", serde_json::to_string(snapshot))
                        }
                        MonitorEvent::Connection(connection) => {
                            ("connection", serde_json::to_string(connection))
                        }
                    };

                    match data {
                        Ok(json) => {
                            debug!("SSE sending event: {}", event_type);
                            yield Ok(Event::default()
                                .event(event_type)
                                .data(json));
                        }
                        Err(e) => {
                            warn!("Failed to serialize SSE event: {}", e);
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    // A slow page only misses intermediate snapshots; the
                    // next one fully replaces the view anyway.
                    warn!("SSE client lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    debug!("SSE broadcast channel closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
