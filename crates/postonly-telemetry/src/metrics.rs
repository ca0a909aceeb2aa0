//! Prometheus metrics for the post-only execution bot.
//!
//! Covers signal intake, execution outcomes, the unwind path and protective
//! exit placement.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Signals accepted for execution.
/// Labels: symbol, side (long/short), class (calm/noisy)
pub static SIGNALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_signals_total",
        "Signals accepted for execution",
        &["symbol", "side", "class"]
    )
    .unwrap()
});

/// Finished executions.
/// Labels: symbol, mode (maker/market/market_fallback/none), outcome (filled/unfilled/error)
pub static EXECUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_executions_total",
        "Finished signal executions",
        &["symbol", "mode", "outcome"]
    )
    .unwrap()
});

/// Wall time of one execute_signal call in milliseconds.
pub static EXECUTION_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "postonly_execution_duration_ms",
        "Duration of one signal execution in milliseconds",
        &["mode"],
        vec![50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0, 60000.0]
    )
    .unwrap()
});

/// Orders accepted by the exchange.
/// Labels: kind (maker_open/maker_close/market_open/market_close/take_profit/stop_loss)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_orders_submitted_total",
        "Orders accepted by the exchange",
        &["kind"]
    )
    .unwrap()
});

/// Orders the exchange refused.
/// Labels: kind, reason (would_match/rejected/transport/other)
pub static ORDERS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_orders_rejected_total",
        "Orders refused by the exchange",
        &["kind", "reason"]
    )
    .unwrap()
});

/// Maker closes escalated to reduce-only market orders.
pub static UNWIND_ESCALATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_unwind_escalations_total",
        "Maker closes escalated to market after a would-match rejection",
        &["symbol"]
    )
    .unwrap()
});

/// Unwinds that exhausted their retry budget.
pub static UNWIND_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_unwind_failures_total",
        "Opposite-position unwinds that exhausted the retry budget",
        &["symbol"]
    )
    .unwrap()
});

/// Protective leg outcomes.
/// Labels: leg (take_profit/stop_loss), outcome (placed/failed/skipped/disabled)
pub static EXIT_LEGS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_exit_legs_total",
        "Protective exit leg outcomes",
        &["leg", "outcome"]
    )
    .unwrap()
});

/// Arbiter latch state (1 = noisy mode latched).
pub static ARBITER_LATCHED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "postonly_arbiter_latched",
        "Signal arbiter noisy-mode latch (1=latched)"
    )
    .unwrap()
});

/// HTTP requests on the ingestion server.
/// Labels: route, status
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "postonly_http_requests_total",
        "Requests served by the signal ingestion server",
        &["route", "status"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a signal entering execution.
    pub fn signal_received(symbol: &str, side: &str, class: &str) {
        SIGNALS_TOTAL.with_label_values(&[symbol, side, class]).inc();
    }

    /// Record a finished execution and its duration.
    pub fn execution_finished(symbol: &str, mode: &str, outcome: &str, duration_ms: f64) {
        EXECUTIONS_TOTAL
            .with_label_values(&[symbol, mode, outcome])
            .inc();
        EXECUTION_DURATION_MS
            .with_label_values(&[mode])
            .observe(duration_ms);
    }

    pub fn order_submitted(kind: &str) {
        ORDERS_SUBMITTED_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn order_rejected(kind: &str, reason: &str) {
        ORDERS_REJECTED_TOTAL.with_label_values(&[kind, reason]).inc();
    }

    pub fn unwind_escalated(symbol: &str) {
        UNWIND_ESCALATIONS_TOTAL.with_label_values(&[symbol]).inc();
    }

    pub fn unwind_failed(symbol: &str) {
        UNWIND_FAILURES_TOTAL.with_label_values(&[symbol]).inc();
    }

    pub fn exit_leg(leg: &str, outcome: &str) {
        EXIT_LEGS_TOTAL.with_label_values(&[leg, outcome]).inc();
    }

    pub fn arbiter_latched(latched: bool) {
        ARBITER_LATCHED.set(i64::from(latched));
    }

    pub fn http_request(route: &str, status: u16) {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Render the default registry in the text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        Metrics::signal_received("ETHUSDT", "long", "calm");
        Metrics::exit_leg("take_profit", "placed");

        let text = Metrics::render().unwrap();
        assert!(text.contains("postonly_signals_total"));
        assert!(text.contains("class=\"calm\""));
        assert!(text.contains("postonly_exit_legs_total"));
    }

    #[test]
    fn test_counters_increment() {
        let before = UNWIND_ESCALATIONS_TOTAL.with_label_values(&["TESTUSDT"]).get();
        Metrics::unwind_escalated("TESTUSDT");
        let after = UNWIND_ESCALATIONS_TOTAL.with_label_values(&["TESTUSDT"]).get();
        assert_eq!(after - before, 1.0);
    }
}
