//! Exchange capability trait.
//!
//! Abstracts the remote venue so the execution engine can run against the
//! Binance binding in production and the simulated exchange in tests.
//!
//! Failure modes every implementation must honour:
//! - a post-only order that would cross is `ExchangeError::WouldImmediatelyMatch`
//! - position and entry price may lag fills; callers poll
//! - cancelling an order that already filled is `ExchangeError::OrderNotFound`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use postonly_core::{Bbo, ClientOrderId, Fill, OrderAck, OrderIntent, Position, Symbol, SymbolSpec};

use crate::error::ExchangeResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capabilities the execution engine needs from a venue.
pub trait Exchange: Send + Sync {
    /// Current position snapshot. Flat positions are returned, never omitted.
    fn position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Position>>;

    /// Top of book.
    fn best_bid_ask<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Bbo>>;

    /// Post-only limit order.
    fn place_maker_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>>;

    fn place_market_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>>;

    /// Take-profit or stop-loss that closes the whole position when touched.
    fn place_trigger_close_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>>;

    fn cancel_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        cloid: &'a ClientOrderId,
    ) -> BoxFuture<'a, ExchangeResult<()>>;

    /// Cancel every open order on the symbol, triggers included.
    fn cancel_all_orders<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<()>>;

    fn symbol_spec<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<SymbolSpec>>;

    /// Account trades on the symbol, oldest first.
    fn trade_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Fill>>>;
}

/// Arc wrapper for Exchange trait objects.
pub type DynExchange = Arc<dyn Exchange>;
