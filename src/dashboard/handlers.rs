//! HTTP route handlers for the mirror server.
//!
//! Pages are rendered server-side from the latest snapshot; the control
//! route validates the action literal and forwards the command to the
//! backend. A forwarded command never mutates local state — its only
//! user-visible effect arrives with the next snapshot.

use crate::backtest::render_backtest_page;
use crate::control::{CommandAction, CommandOutcome};
use crate::dashboard::sse::create_sse_stream;
use crate::dashboard::state::AppState;
use crate::model::{ConnectionState, DashboardSnapshot};
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

// ============================================================================
// PAGES
// ============================================================================

/// Live monitor page, rendered from the latest snapshot.
pub async fn index_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(state.monitor.render_live_page().await)
}

/// Backtest results page.
pub async fn backtest_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(render_backtest_page(&state.backtest))
}

// ============================================================================
// API
// ============================================================================

/// Mirror of the latest backend status, for debugging and scripts.
#[derive(Serialize)]
pub struct StatusResponse {
    pub connection: ConnectionState,
    pub snapshot: Option<DashboardSnapshot>,
}

pub async fn api_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connection: state.monitor.connection().await,
        snapshot: state.monitor.latest_snapshot().await,
    })
}

/// SSE events endpoint
pub async fn api_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    create_sse_stream(state.monitor.clone())
}

// ============================================================================
// CONTROL
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub action: String, // "start" or "stop"
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
}

/// Forward a start/stop command for the named strategy to the backend.
///
/// The target name is not validated here; the backend rejects unknown
/// strategies itself. The dispatch outcome is relayed for observability but
/// the response never reflects strategy state — that comes from the feed.
pub async fn strategy_command(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let Some(action) = CommandAction::parse(&request.action) else {
        return Json(CommandResponse {
            success: false,
            target: name,
            message: format!(
                "Invalid action '{}'. Use 'start' or 'stop'",
                request.action
            ),
            outcome: None,
        });
    };

    let outcome = state.control.send_command(&name, action).await;
    let message = match &outcome {
        CommandOutcome::Accepted { .. } => format!("{} command forwarded", action),
        CommandOutcome::Rejected { status } => {
            format!("{} command rejected by backend (HTTP {})", action, status)
        }
        CommandOutcome::Failed { .. } => format!("{} command failed to reach backend", action),
    };

    Json(CommandResponse {
        success: outcome.is_accepted(),
        target: name,
        message,
        outcome: Some(outcome),
    })
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connection: ConnectionState,
    pub snapshots_received: u64,
    pub parse_failures: u64,
    pub commands_sent: u64,
    pub commands_failed: u64,
}

static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = START_TIME.get_or_init(std::time::Instant::now);
    let (commands_sent, commands_failed) = state.control.stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: start.elapsed().as_secs(),
        connection: state.monitor.connection().await,
        snapshots_received: state.monitor.snapshots_received.load(Ordering::Relaxed),
        parse_failures: state.monitor.parse_failures.load(Ordering::Relaxed),
        commands_sent,
        commands_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::sample_report;
    use crate::control::ControlClient;
    use crate::dashboard::state::MonitorState;
    use crate::model::{StrategyState, StrategyStatus};
    use std::collections::BTreeMap;

    async fn app_state() -> Arc<AppState> {
        // Control client points at a dead port; dispatch outcomes are Failed
        // but never errors.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        Arc::new(AppState {
            monitor: MonitorState::new(),
            control: ControlClient::new(format!("http://{}/api", addr)),
            backtest: sample_report(),
        })
    }

    fn snapshot() -> DashboardSnapshot {
        let mut strategies = BTreeMap::new();
        strategies.insert(
            "Survivor".to_string(),
            StrategyState {
                status: StrategyStatus::Running,
                ..Default::default()
            },
        );
        DashboardSnapshot {
            global_pnl: 150.0,
            brokers: BTreeMap::new(),
            strategies,
        }
    }

    #[tokio::test]
    async fn invalid_action_is_not_dispatched() {
        let state = app_state().await;
        let response = strategy_command(
            State(state.clone()),
            Path("Survivor".to_string()),
            Json(CommandRequest {
                action: "restart".to_string(),
            }),
        )
        .await;

        let Json(body) = response;
        assert!(!body.success);
        assert!(body.outcome.is_none());
        assert_eq!(state.control.stats().0, 0);
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_alter_rendered_state() {
        let state = app_state().await;
        state.monitor.apply_snapshot(snapshot()).await;
        let page_before = state.monitor.render_live_page().await;

        let response = strategy_command(
            State(state.clone()),
            Path("Survivor".to_string()),
            Json(CommandRequest {
                action: "start".to_string(),
            }),
        )
        .await;

        let Json(body) = response;
        assert!(!body.success);
        assert!(matches!(body.outcome, Some(CommandOutcome::Failed { .. })));

        // The rendered view only ever changes with the next snapshot.
        let page_after = state.monitor.render_live_page().await;
        assert_eq!(page_before, page_after);
    }

    #[tokio::test]
    async fn status_mirrors_latest_snapshot() {
        let state = app_state().await;
        state.monitor.apply_snapshot(snapshot()).await;

        let response = api_status(State(state)).await;
        let Json(body) = response;
        assert_eq!(body.snapshot.unwrap().global_pnl, 150.0);
        assert_eq!(body.connection, ConnectionState::Connecting);
    }
}
