//! Server-side HTML rendering for the live monitor view.
//!
//! Everything here is a pure function of the most recently received snapshot:
//! rendering the same snapshot twice produces identical output, and no
//! strategy state is ever mutated outside a re-render. The one exception is
//! [`SignalLog`], which appends rather than replaces.

use crate::control::encode_segment;
use crate::model::{ConnectionState, DashboardSnapshot, StrategyState, StrategyStatus};
use chrono::{DateTime, Utc};

/// Upper bound on retained signal-log rows. The browser original grew the
/// table for the lifetime of the page; a long-lived process drops the oldest
/// rows past this cap instead.
const MAX_LOG_ROWS: usize = 1000;

/// Placeholder shown when a currency value is missing or not a number.
const INR_PLACEHOLDER: &str = "₹0.00";

// ============================================================================
// FORMATTING HELPERS
// ============================================================================

/// Format a value as Indian rupees with en-IN digit grouping (last three
/// digits, then groups of two): `1234567.89` -> `₹12,34,567.89`.
///
/// Missing or non-finite values render the zero placeholder; this never
/// panics.
pub fn format_inr(value: Option<f64>) -> String {
    let v = match value {
        Some(v) if v.is_finite() => v,
        _ => return INR_PLACEHOLDER.to_string(),
    };

    let sign = if v < 0.0 { "-" } else { "" };
    let cents = (v.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;
    format!("{}₹{}.{:02}", sign, group_indian(whole), frac)
}

/// Indian digit grouping for a whole number.
fn group_indian(mut n: u64) -> String {
    let tail = n % 1000;
    n /= 1000;
    if n == 0 {
        return tail.to_string();
    }

    let mut heads: Vec<u64> = Vec::new();
    while n > 0 {
        heads.push(n % 100);
        n /= 100;
    }

    let mut out = heads.pop().map(|h| h.to_string()).unwrap_or_default();
    for head in heads.into_iter().rev() {
        out.push_str(&format!(",{:02}", head));
    }
    out.push_str(&format!(",{:03}", tail));
    out
}

/// Styling class for a P&L value. Zero and positive are treated identically:
/// non-negative means the positive variant.
pub fn pnl_class(value: f64) -> &'static str {
    if value >= 0.0 {
        "text-green-600"
    } else {
        "text-red-600"
    }
}

/// Badge classes for a strategy status.
pub fn status_class(status: StrategyStatus) -> &'static str {
    match status {
        StrategyStatus::Running => "bg-green-100 text-green-800",
        StrategyStatus::Stopped => "bg-gray-100 text-gray-600",
        StrategyStatus::Error => "bg-red-100 text-red-800",
        StrategyStatus::Unknown => "bg-yellow-100 text-yellow-800",
    }
}

/// Indicator dot class and label for the connection state.
pub fn connection_badge(state: ConnectionState) -> (&'static str, &'static str) {
    match state {
        ConnectionState::Connecting => ("bg-yellow-400", "Connecting"),
        ConnectionState::Connected => ("bg-green-500", "Live"),
        ConnectionState::Disconnected => ("bg-red-500", "Disconnected"),
    }
}

/// Broker status cell class: "Connected" is the positive variant, anything
/// else negative.
fn broker_class(status: &str) -> &'static str {
    if status.eq_ignore_ascii_case("connected") {
        "text-green-600"
    } else {
        "text-red-600"
    }
}

/// Simple HTML escaping to prevent XSS
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

// ============================================================================
// LIVE VIEW SECTIONS
// ============================================================================

/// Stats header: global P&L card plus broker links.
pub fn render_stats_header(snapshot: &DashboardSnapshot) -> String {
    let mut html = format!(
        r#"<div class="grid grid-cols-1 md:grid-cols-2 gap-4">
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Global P&amp;L</div>
        <div id="global-pnl" class="text-2xl font-bold {}">{}</div>
    </div>
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Brokers</div>
        <div class="mt-1 space-x-4">"#,
        pnl_class(snapshot.global_pnl),
        format_inr(Some(snapshot.global_pnl)),
    );

    if snapshot.brokers.is_empty() {
        html.push_str(r#"<span class="text-sm text-gray-400">No broker data</span>"#);
    } else {
        for (name, status) in &snapshot.brokers {
            html.push_str(&format!(
                r#"<span class="text-sm font-medium text-gray-700">{}</span> <span class="text-sm {}">{}</span>"#,
                html_escape(name),
                broker_class(status),
                html_escape(status),
            ));
        }
    }

    html.push_str("</div></div></div>");
    html
}

/// Strategy grid: one card per strategy with status, position, P&L and the
/// start/stop controls. Start is enabled iff the strategy is not running,
/// Stop iff it is.
pub fn render_strategy_grid(snapshot: &DashboardSnapshot) -> String {
    if snapshot.strategies.is_empty() {
        return r#"<div class="text-center py-8 text-gray-500">
            <p class="mt-2">No strategies registered</p>
        </div>"#
            .to_string();
    }

    let mut html =
        String::from(r#"<div class="grid grid-cols-1 md:grid-cols-3 gap-4">"#);

    for (name, state) in &snapshot.strategies {
        html.push_str(&render_strategy_card(name, state));
    }

    html.push_str("</div>");
    html
}

fn render_strategy_card(name: &str, state: &StrategyState) -> String {
    let running = state.status.is_running();
    let start_disabled = if running { " disabled" } else { "" };
    let stop_disabled = if running { "" } else { " disabled" };
    let control_path = format!("/strategy/{}", encode_segment(name));

    format!(
        r#"<div class="bg-white rounded-lg shadow p-4">
    <div class="flex justify-between items-center">
        <span class="text-lg font-medium text-gray-900">{name}</span>
        <span class="px-2 py-1 text-xs font-medium rounded-full {status_class}">{status}</span>
    </div>
    <dl class="mt-3 text-sm text-gray-600 space-y-1">
        <div><dt class="inline font-medium">Position:</dt> <dd class="inline">{position}</dd></div>
        <div><dt class="inline font-medium">Active orders:</dt> <dd class="inline">{orders}</dd></div>
        <div><dt class="inline font-medium">Last signal:</dt> <dd class="inline">{signal}</dd></div>
        <div><dt class="inline font-medium">Realized:</dt> <dd class="inline {realized_class}">{realized}</dd></div>
        <div><dt class="inline font-medium">Unrealized:</dt> <dd class="inline {unrealized_class}">{unrealized}</dd></div>
        <div><dt class="inline font-medium">Trades:</dt> <dd class="inline">{taken} taken / {open} open / {closed} closed</dd></div>
    </dl>
    <div class="mt-4 flex space-x-2">
        <button hx-post="{path}" hx-vals='{{"action": "start"}}' hx-swap="none"
                class="px-3 py-1 text-sm rounded bg-green-600 text-white disabled:bg-gray-300"{start_disabled}>Start</button>
        <button hx-post="{path}" hx-vals='{{"action": "stop"}}' hx-swap="none"
                class="px-3 py-1 text-sm rounded bg-red-600 text-white disabled:bg-gray-300"{stop_disabled}>Stop</button>
    </div>
</div>"#,
        name = html_escape(name),
        status_class = status_class(state.status),
        status = state.status,
        position = html_escape(state.current_position.as_deref().unwrap_or("Flat")),
        orders = state
            .active_orders
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        signal = html_escape(state.last_signal.as_deref().unwrap_or("Awaiting...")),
        realized_class = pnl_class(state.realized_pnl),
        realized = format_inr(Some(state.realized_pnl)),
        unrealized_class = pnl_class(state.unrealized_pnl),
        unrealized = format_inr(Some(state.unrealized_pnl)),
        taken = state.trades_taken,
        open = state.open_trades,
        closed = state.closed_trades,
        path = control_path,
        start_disabled = start_disabled,
        stop_disabled = stop_disabled,
    )
}

// ============================================================================
// SIGNAL LOG (append semantics)
// ============================================================================

/// One recorded signal-log row.
#[derive(Debug, Clone)]
pub struct LogRow {
    /// Wall clock at record time, not event time. The backend does not stamp
    /// snapshots, so this column reflects the monitor's clock.
    pub time: String,
    pub strategy: String,
    pub status: StrategyStatus,
    pub signal: String,
    pub total_pnl: f64,
}

/// Running log of strategy signals. Unlike every other section of the view,
/// this one appends on each applied snapshot instead of being replaced.
#[derive(Debug, Default)]
pub struct SignalLog {
    rows: Vec<LogRow>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one row per strategy in the snapshot, stamped with the current
    /// wall clock.
    pub fn record(&mut self, snapshot: &DashboardSnapshot) {
        self.record_at(snapshot, Utc::now());
    }

    /// Append rows with an explicit timestamp.
    pub fn record_at(&mut self, snapshot: &DashboardSnapshot, at: DateTime<Utc>) {
        let time = at.format("%H:%M:%S").to_string();
        for (name, state) in &snapshot.strategies {
            self.rows.push(LogRow {
                time: time.clone(),
                strategy: name.clone(),
                status: state.status,
                signal: state
                    .last_signal
                    .clone()
                    .unwrap_or_else(|| "Awaiting...".to_string()),
                total_pnl: state.total_pnl(),
            });
        }

        if self.rows.len() > MAX_LOG_ROWS {
            let excess = self.rows.len() - MAX_LOG_ROWS;
            self.rows.drain(..excess);
        }
    }

    /// Render the log table, newest rows last.
    pub fn render_table(&self) -> String {
        if self.rows.is_empty() {
            return r#"<div class="text-center py-8 text-gray-500">
            <p class="mt-2">No signals logged yet</p>
        </div>"#
                .to_string();
        }

        let mut html = String::from(
            r#"<table class="min-w-full divide-y divide-gray-200">
        <thead class="bg-gray-50">
            <tr>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Time</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Strategy</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Status</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Signal</th>
                <th class="px-4 py-2 text-right text-xs font-medium text-gray-500 uppercase tracking-wider">P&amp;L</th>
            </tr>
        </thead>
        <tbody class="bg-white divide-y divide-gray-200">"#,
        );

        for row in &self.rows {
            html.push_str(&format!(
                r#"
            <tr>
                <td class="px-4 py-2 whitespace-nowrap text-sm text-gray-500">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm font-medium text-gray-900">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm"><span class="px-2 py-0.5 text-xs font-medium rounded-full {}">{}</span></td>
                <td class="px-4 py-2 text-sm text-gray-600">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm {} text-right">{}</td>
            </tr>"#,
                row.time,
                html_escape(&row.strategy),
                status_class(row.status),
                row.status,
                html_escape(&row.signal),
                pnl_class(row.total_pnl),
                format_inr(Some(row.total_pnl)),
            ));
        }

        html.push_str("</tbody></table>");
        html
    }
}

// ============================================================================
// FULL PAGE
// ============================================================================

/// Assemble the complete live-monitor page. Replace-based sections (header,
/// grid) are derived only from `snapshot`; the log table carries its own
/// appended history.
pub fn render_live_page(
    snapshot: Option<&DashboardSnapshot>,
    connection: ConnectionState,
    log: &SignalLog,
) -> String {
    let (dot_class, label) = connection_badge(connection);

    let body = match snapshot {
        Some(snap) => format!(
            r#"{header}
        <div class="mt-6">
            <h2 class="text-lg font-medium text-gray-900 mb-3">Strategies</h2>
            {grid}
        </div>
        <div class="mt-6 bg-white rounded-lg shadow overflow-x-auto">
            <h2 class="text-lg font-medium text-gray-900 p-4 pb-0">Signal Log</h2>
            {log}
        </div>"#,
            header = render_stats_header(snap),
            grid = render_strategy_grid(snap),
            log = log.render_table(),
        ),
        None => r#"<div class="text-center py-16 text-gray-500">
            <p>Awaiting first snapshot from the trading hub...</p>
        </div>"#
            .to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <title>AlgoTrading Hub - Live Monitor</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body class="bg-gray-100">
    <div class="max-w-6xl mx-auto p-6">
        <div class="flex justify-between items-center mb-6">
            <h1 class="text-2xl font-bold text-gray-900">Live Strategy Monitor</h1>
            <div class="flex items-center space-x-4">
                <a href="/backtest" class="text-sm text-blue-600 hover:underline">Backtest Results</a>
                <span class="flex items-center text-sm text-gray-600">
                    <span id="conn-dot" class="inline-block w-3 h-3 rounded-full mr-2 {dot_class}"></span>{label}
                </span>
            </div>
        </div>
        {body}
    </div>
    <script>
        // Re-pull the rendered page whenever the mirror pushes an event.
        const source = new EventSource("/events");
        let refreshing = false;
        source.onmessage = () => {{}};
        source.addEventListener("snapshot", refresh);
        source.addEventListener("connection", refresh);
        function refresh() {{
            if (refreshing) return;
            refreshing = true;
            fetch("/").then(r => r.text()).then(html => {{
                const doc = new DOMParser().parseFromString(html, "text/html");
                document.body.innerHTML = doc.body.innerHTML;
                htmx.process(document.body);
                refreshing = false;
            }}).catch(() => {{ refreshing = false; }});
        }}
    </script>
</body>
</html>"#,
        dot_class = dot_class,
        label = label,
        body = body,
    )
}
