//! `report` subcommand: round trips from trade history.

use chrono::{DateTime, NaiveDate, Utc};
use postonly_core::Symbol;
use postonly_exchange::Exchange;
use postonly_report::{fetch_round_trips, summarize, ReportSummary, RoundTrip};
use serde::Serialize;
use std::fmt::Write as _;

use crate::error::{AppError, AppResult};

/// Parse `--since`: RFC 3339 timestamp or a `YYYY-MM-DD` date (UTC midnight).
pub fn parse_since(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::Config(format!("--since: cannot parse {raw:?}")))
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    symbol: &'a Symbol,
    since: Option<DateTime<Utc>>,
    summary: &'a ReportSummary,
    round_trips: &'a [RoundTrip],
}

/// Fetch and render the report for one symbol.
pub async fn build_report(
    exchange: &dyn Exchange,
    symbol: &Symbol,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> AppResult<String> {
    let trips = fetch_round_trips(exchange, symbol, since).await?;
    let summary = summarize(&trips);
    tracing::info!(%symbol, round_trips = trips.len(), net_pnl = %summary.net_pnl, "Report built");

    if json {
        let doc = ReportDocument {
            symbol,
            since,
            summary: &summary,
            round_trips: &trips,
        };
        return serde_json::to_string_pretty(&doc)
            .map_err(|e| AppError::Config(format!("Failed to render report: {e}")));
    }
    Ok(render_text(symbol, &trips, &summary))
}

fn render_text(symbol: &Symbol, trips: &[RoundTrip], summary: &ReportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{symbol}: {} round trips", summary.round_trips);
    for t in trips {
        let _ = writeln!(
            out,
            "{}  {:<5} size={} entry={} exit={} net={} held={}s",
            t.closed_at.format("%Y-%m-%d %H:%M:%S"),
            t.direction.as_str(),
            t.peak_size,
            t.entry_price,
            t.exit_price,
            t.net_pnl,
            t.holding_time().num_seconds(),
        );
    }
    let win_rate = summary
        .win_rate
        .map_or_else(|| "-".to_string(), |r| format!("{:.1}%", r * rust_decimal::Decimal::ONE_HUNDRED));
    let _ = writeln!(
        out,
        "wins={} losses={} win_rate={} gross={} fees={} net={}",
        summary.wins, summary.losses, win_rate, summary.gross_pnl, summary.fees, summary.net_pnl
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_since() {
        assert_eq!(
            parse_since("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_since("2024-03-01T12:30:00+09:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 3, 30, 0).unwrap()
        );
        assert!(parse_since("yesterday").is_err());
    }
}
