//! Per-execution view of one symbol on the exchange.
//!
//! Bundles what every stage needs (exchange, spec, timing) and the polling
//! primitives they share. Lives for one `execute_signal` call.

use std::time::Duration;

use postonly_core::{Bbo, ClientOrderId, OrderIntent, Position, Symbol, SymbolSpec};
use postonly_exchange::{Exchange, ExchangeError, ExchangeResult};
use postonly_telemetry::Metrics;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ExecutorConfig;

pub(crate) struct SymbolSession<'a> {
    pub exchange: &'a dyn Exchange,
    pub config: &'a ExecutorConfig,
    pub symbol: &'a Symbol,
    pub spec: &'a SymbolSpec,
}

impl<'a> SymbolSession<'a> {
    pub async fn position(&self) -> ExchangeResult<Position> {
        self.exchange.position(self.symbol).await
    }

    pub async fn quote(&self) -> ExchangeResult<Bbo> {
        self.exchange.best_bid_ask(self.symbol).await
    }

    /// Submit and count an order by kind.
    pub async fn submit(&self, intent: &OrderIntent) -> ExchangeResult<()> {
        let kind = intent.kind.to_string();
        let result = if intent.kind.is_trigger() {
            self.exchange.place_trigger_close_order(intent).await
        } else if intent.kind.is_maker() {
            self.exchange.place_maker_order(intent).await
        } else {
            self.exchange.place_market_order(intent).await
        };
        match result {
            Ok(ack) => {
                Metrics::order_submitted(&kind);
                debug!(
                    symbol = %self.symbol,
                    cloid = %ack.cloid,
                    order_id = ?ack.order_id,
                    side = %intent.side,
                    quantity = %intent.quantity,
                    price = ?intent.price.map(|p| p.to_string()),
                    kind = %kind,
                    "Order accepted"
                );
                Ok(())
            }
            Err(e) => {
                Metrics::order_rejected(&kind, rejection_reason(&e));
                Err(e)
            }
        }
    }

    /// Cancel a resting order. An order that is already gone (filled or
    /// expired) is not an error.
    pub async fn cancel_quietly(&self, cloid: &ClientOrderId) {
        match self.exchange.cancel_order(self.symbol, cloid).await {
            Ok(()) => debug!(symbol = %self.symbol, %cloid, "Order cancelled"),
            Err(ExchangeError::OrderNotFound(_)) => {
                debug!(symbol = %self.symbol, %cloid, "Order already gone at cancel")
            }
            Err(e) => warn!(symbol = %self.symbol, %cloid, error = %e, "Cancel failed"),
        }
    }

    /// Poll the position until `done` holds or `timeout` elapses.
    ///
    /// Always polls at least once. Read errors count as "not yet". Returns
    /// the last successfully read position and whether `done` held for it.
    pub async fn poll_position<F>(&self, timeout: Duration, done: F) -> (Option<Position>, bool)
    where
        F: Fn(&Position) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut last = None;
        loop {
            match self.position().await {
                Ok(pos) => {
                    let ok = done(&pos);
                    last = Some(pos);
                    if ok {
                        return (last, true);
                    }
                }
                Err(e) => debug!(symbol = %self.symbol, error = %e, "Position poll failed"),
            }
            if Instant::now() >= deadline {
                return (last, false);
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    pub async fn pause(&self) {
        sleep(self.config.retry_pause()).await;
    }
}

/// Label for the rejection counter.
pub(crate) fn rejection_reason(err: &ExchangeError) -> &'static str {
    match err {
        ExchangeError::WouldImmediatelyMatch(_) => "would_match",
        ExchangeError::Rejected { .. } => "rejected",
        ExchangeError::RateLimited(_) => "rate_limited",
        ExchangeError::Transport(_) => "transport",
        _ => "other",
    }
}
