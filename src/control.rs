//! Command dispatch to the backend control endpoint.
//!
//! Start/stop commands are fire-and-forget: `POST {base}/strategy/{name}` with
//! `{"action": "start" | "stop"}`. The HTTP outcome is logged and reported as a
//! [`CommandOutcome`] value; it never becomes an error at the caller and never
//! mutates rendered state. The next pushed snapshot is the sole source of
//! truth for whether a command took effect. Target names are forwarded
//! unvalidated; the backend rejects unknown strategies itself.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for control calls. Generous; dispatch never blocks the
/// render path either way.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// The two supported control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
}

impl CommandAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Start => "start",
            CommandAction::Stop => "stop",
        }
    }

    /// Parse the action literal from a request body.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(CommandAction::Start),
            "stop" => Some(CommandAction::Stop),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit result of a dispatched command, in place of console-only logging.
/// Observers (logs, the mirror's control route) can inspect it; the rendered
/// view never does.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum CommandOutcome {
    /// Backend answered 2xx. The body is relayed verbatim, not interpreted.
    Accepted { response: serde_json::Value },
    /// Backend answered with a non-success status.
    Rejected { status: u16 },
    /// The request never completed (connect/timeout/transport failure).
    Failed { reason: String },
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted { .. })
    }
}

/// Client for the backend's strategy control endpoint.
pub struct ControlClient {
    base_url: String,
    client: reqwest::Client,
    commands_sent: AtomicU64,
    commands_failed: AtomicU64,
}

impl ControlClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            client,
            commands_sent: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
        }
    }

    /// Control URL for a named strategy.
    fn strategy_url(&self, target: &str) -> String {
        format!("{}/strategy/{}", self.base_url, encode_segment(target))
    }

    /// Dispatch counters: (sent, failed).
    pub fn stats(&self) -> (u64, u64) {
        (
            self.commands_sent.load(Ordering::Relaxed),
            self.commands_failed.load(Ordering::Relaxed),
        )
    }

    /// Send a start/stop command for `target`. Never returns an error and
    /// never retries; all failures end up in the returned outcome and the log.
    pub async fn send_command(&self, target: &str, action: CommandAction) -> CommandOutcome {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
        let url = self.strategy_url(target);
        debug!("[CONTROL] {} {} -> {}", action, target, url);

        let result = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "action": action.as_str() }))
            .send()
            .await;

        let outcome = match result {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    // Body is logged, never interpreted.
                    let body = resp
                        .json::<serde_json::Value>()
                        .await
                        .unwrap_or(serde_json::Value::Null);
                    debug!("[CONTROL] {} '{}' acknowledged: {}", action, target, body);
                    CommandOutcome::Accepted { response: body }
                } else {
                    CommandOutcome::Rejected {
                        status: status.as_u16(),
                    }
                }
            }
            Err(e) => CommandOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            CommandOutcome::Accepted { .. } => {}
            CommandOutcome::Rejected { status } => {
                self.commands_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[CONTROL] {} '{}' rejected by backend (HTTP {})",
                    action, target, status
                );
            }
            CommandOutcome::Failed { reason } => {
                self.commands_failed.fetch_add(1, Ordering::Relaxed);
                warn!("[CONTROL] {} '{}' failed: {}", action, target, reason);
            }
        }

        outcome
    }
}

/// Percent-encode a single path segment. Strategy names may carry spaces
/// ("Wave Extractor"); everything outside the unreserved set is encoded.
pub(crate) fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
