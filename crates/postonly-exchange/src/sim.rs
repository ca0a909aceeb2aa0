//! Deterministic in-memory exchange.
//!
//! Models just enough of a futures venue for the execution engine: a static
//! top of book per symbol, resting post-only orders that fill when the
//! position is polled, immediate market fills, trigger orders that rest
//! forever, and a journal of every request. Failure injection knobs cover
//! the rejection paths the engine has to survive.
//!
//! Used by the engine tests and by the bot's paper mode.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use postonly_core::{
    Bbo, ClientOrderId, Fill, MarginType, OrderAck, OrderIntent, OrderKind, OrderSide, Position,
    Price, Size, Symbol, SymbolSpec,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{BoxFuture, Exchange};

const MAKER_FEE_RATE: Decimal = dec!(0.0002);
const TAKER_FEE_RATE: Decimal = dec!(0.0004);
const SIM_LEVERAGE: u32 = 10;

/// Fill behaviour of the simulated venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimBehavior {
    /// Fraction of a resting maker order's original quantity filled on each
    /// position poll. 1 fills on the first poll.
    pub maker_fill_ratio_per_poll: Decimal,
    /// Total maker quantity allowed to fill per symbol. `None` is unlimited.
    pub maker_fill_cap: Option<Decimal>,
    /// When false, market orders are accepted but never fill.
    pub market_orders_fill: bool,
    /// Position polls after an opening fill during which no entry price is
    /// reported.
    pub entry_price_lag_polls: u32,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            maker_fill_ratio_per_poll: Decimal::ONE,
            maker_fill_cap: None,
            market_orders_fill: true,
            entry_price_lag_polls: 0,
        }
    }
}

/// One request seen by the simulated venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Placed(OrderIntent),
    Rejected { intent: OrderIntent, error: String },
    Cancelled { symbol: Symbol, cloid: ClientOrderId },
    CancelledAll(Symbol),
}

#[derive(Debug)]
struct SimMarket {
    spec: SymbolSpec,
    book: Bbo,
    amount: Decimal,
    entry: Option<Price>,
    entry_lag: u32,
    maker_filled: Decimal,
}

#[derive(Debug)]
struct RestingOrder {
    intent: OrderIntent,
    remaining: Decimal,
    order_id: u64,
}

#[derive(Debug, Default)]
struct SimState {
    markets: HashMap<Symbol, SimMarket>,
    resting: Vec<RestingOrder>,
    triggers: Vec<OrderIntent>,
    journal: Vec<JournalEntry>,
    fills: Vec<Fill>,
    behavior: SimBehavior,
    reject_makers: u32,
    failing_triggers: HashSet<OrderKind>,
    failing_position_reads: u32,
    cancel_all_fails: bool,
    market_rejects: bool,
    next_order_id: u64,
}

impl SimState {
    fn market(&self, symbol: &Symbol) -> ExchangeResult<&SimMarket> {
        self.markets
            .get(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    fn market_mut(&mut self, symbol: &Symbol) -> ExchangeResult<&mut SimMarket> {
        self.markets
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    fn ack(&mut self, intent: &OrderIntent) -> OrderAck {
        self.next_order_id += 1;
        OrderAck {
            cloid: intent.cloid.clone(),
            order_id: Some(self.next_order_id),
        }
    }

    fn reject(&mut self, intent: &OrderIntent, error: ExchangeError) -> ExchangeError {
        self.journal.push(JournalEntry::Rejected {
            intent: intent.clone(),
            error: error.to_string(),
        });
        error
    }

    /// Quantity an order on `side` may reduce without flipping the position.
    fn reducible(&self, symbol: &Symbol, side: OrderSide) -> Decimal {
        self.markets.get(symbol).map_or(Decimal::ZERO, |m| match side {
            OrderSide::Buy if m.amount < Decimal::ZERO => -m.amount,
            OrderSide::Sell if m.amount > Decimal::ZERO => m.amount,
            _ => Decimal::ZERO,
        })
    }

    fn apply_fill(
        &mut self,
        symbol: &Symbol,
        side: OrderSide,
        qty: Decimal,
        price: Price,
        fee_rate: Decimal,
        order_id: u64,
    ) {
        let lag = self.behavior.entry_price_lag_polls;
        let Some(market) = self.markets.get_mut(symbol) else {
            return;
        };
        let signed = match side {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        };
        let old = market.amount;
        let new = old + signed;
        let mut realized = Decimal::ZERO;

        if old.is_zero() || old.is_sign_positive() == signed.is_sign_positive() {
            let old_abs = old.abs();
            let old_entry = market.entry.map_or(price.inner(), |p| p.inner());
            let avg = (old_abs * old_entry + qty * price.inner()) / (old_abs + qty);
            market.entry = Some(Price::new(avg));
            market.entry_lag = lag;
        } else {
            let closing = qty.min(old.abs());
            if let Some(entry) = market.entry {
                let direction = if old > Decimal::ZERO {
                    Decimal::ONE
                } else {
                    -Decimal::ONE
                };
                realized = closing * (price.inner() - entry.inner()) * direction;
            }
            if new.is_zero() {
                market.entry = None;
            } else if new.is_sign_positive() != old.is_sign_positive() {
                market.entry = Some(price);
                market.entry_lag = lag;
            }
        }
        market.amount = new;

        self.fills.push(Fill {
            symbol: symbol.clone(),
            side,
            quantity: Size::new(qty),
            price,
            commission: qty * price.inner() * fee_rate,
            realized_pnl: realized,
            time: Utc::now(),
            order_id,
        });
    }

    /// Fill resting maker orders for one poll.
    fn process_maker_fills(&mut self, symbol: &Symbol) {
        let ratio = self.behavior.maker_fill_ratio_per_poll;
        let cap = self.behavior.maker_fill_cap;

        let orders = std::mem::take(&mut self.resting);
        let mut kept = Vec::with_capacity(orders.len());
        for mut order in orders {
            if &order.intent.symbol != symbol {
                kept.push(order);
                continue;
            }
            let mut chunk = if ratio >= Decimal::ONE {
                order.remaining
            } else {
                (order.intent.quantity.inner() * ratio).min(order.remaining)
            };
            if let Some(cap) = cap {
                let used = self.markets.get(symbol).map_or(Decimal::ZERO, |m| m.maker_filled);
                chunk = chunk.min((cap - used).max(Decimal::ZERO));
            }
            if order.intent.reduce_only() {
                chunk = chunk.min(self.reducible(symbol, order.intent.side));
            }
            if chunk > Decimal::ZERO {
                let price = order.intent.price.unwrap_or(Price::ZERO);
                order.remaining -= chunk;
                if let Some(m) = self.markets.get_mut(symbol) {
                    m.maker_filled += chunk;
                }
                // Apply immediately so later reduce-only orders see the new size.
                self.apply_fill(symbol, order.intent.side, chunk, price, MAKER_FEE_RATE, order.order_id);
                debug!(%symbol, cloid = %order.intent.cloid, qty = %chunk, "sim maker fill");
            }
            if order.remaining > Decimal::ZERO {
                kept.push(order);
            }
        }
        self.resting = kept;
    }
}

/// Deterministic in-memory exchange.
#[derive(Debug, Default)]
pub struct SimExchange {
    state: Mutex<SimState>,
}

impl SimExchange {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_behavior(self, behavior: SimBehavior) -> Self {
        self.state.lock().behavior = behavior;
        self
    }

    /// Register a symbol with its spec and a static book.
    pub fn add_symbol(&self, symbol: Symbol, spec: SymbolSpec, bid: Price, ask: Price) {
        self.state.lock().markets.insert(
            symbol,
            SimMarket {
                spec,
                book: Bbo::new(bid, ask),
                amount: Decimal::ZERO,
                entry: None,
                entry_lag: 0,
                maker_filled: Decimal::ZERO,
            },
        );
    }

    pub fn set_book(&self, symbol: &Symbol, bid: Price, ask: Price) {
        if let Some(m) = self.state.lock().markets.get_mut(symbol) {
            m.book = Bbo::new(bid, ask);
        }
    }

    /// Overwrite the position directly (no fill recorded).
    pub fn set_position(&self, symbol: &Symbol, amount: Decimal, entry: Option<Price>) {
        if let Some(m) = self.state.lock().markets.get_mut(symbol) {
            m.amount = amount;
            m.entry = if amount.is_zero() { None } else { entry };
            m.entry_lag = 0;
        }
    }

    pub fn set_behavior(&self, behavior: SimBehavior) {
        self.state.lock().behavior = behavior;
    }

    pub fn set_maker_fill_cap(&self, cap: Option<Decimal>) {
        self.state.lock().behavior.maker_fill_cap = cap;
    }

    pub fn set_market_orders_fill(&self, fill: bool) {
        self.state.lock().behavior.market_orders_fill = fill;
    }

    /// Reject the next `n` maker orders as would-immediately-match.
    pub fn reject_next_maker_orders(&self, n: u32) {
        self.state.lock().reject_makers = n;
    }

    /// Make trigger orders of `kind` fail until cleared.
    pub fn fail_trigger_orders(&self, kind: OrderKind, fail: bool) {
        let mut state = self.state.lock();
        if fail {
            state.failing_triggers.insert(kind);
        } else {
            state.failing_triggers.remove(&kind);
        }
    }

    /// Fail the next `n` position reads with a transport error.
    pub fn fail_next_position_reads(&self, n: u32) {
        self.state.lock().failing_position_reads = n;
    }

    pub fn fail_cancel_all(&self, fail: bool) {
        self.state.lock().cancel_all_fails = fail;
    }

    /// Reject every market order with an insufficient-margin error.
    pub fn reject_market_orders(&self, reject: bool) {
        self.state.lock().market_rejects = reject;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    /// Accepted orders in submission order.
    pub fn placed_orders(&self) -> Vec<OrderIntent> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Placed(intent) => Some(intent.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn placed_of_kind(&self, kind: OrderKind) -> Vec<OrderIntent> {
        self.placed_orders()
            .into_iter()
            .filter(|o| o.kind == kind)
            .collect()
    }

    pub fn rejected_orders(&self) -> Vec<OrderIntent> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Rejected { intent, .. } => Some(intent.clone()),
                _ => None,
            })
            .collect()
    }

    /// Trigger orders still resting on the symbol.
    pub fn open_triggers(&self, symbol: &Symbol) -> Vec<OrderIntent> {
        self.state
            .lock()
            .triggers
            .iter()
            .filter(|t| &t.symbol == symbol)
            .cloned()
            .collect()
    }

    /// Maker orders still resting on the symbol.
    pub fn resting_orders(&self, symbol: &Symbol) -> Vec<OrderIntent> {
        self.state
            .lock()
            .resting
            .iter()
            .filter(|o| &o.intent.symbol == symbol)
            .map(|o| o.intent.clone())
            .collect()
    }

    /// Signed position without triggering fills.
    pub fn position_amount(&self, symbol: &Symbol) -> Decimal {
        self.state
            .lock()
            .markets
            .get(symbol)
            .map_or(Decimal::ZERO, |m| m.amount)
    }

    pub fn fills(&self, symbol: &Symbol) -> Vec<Fill> {
        self.state
            .lock()
            .fills
            .iter()
            .filter(|f| &f.symbol == symbol)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Request handling
    // ------------------------------------------------------------------

    fn read_position(&self, symbol: &Symbol) -> ExchangeResult<Position> {
        let mut state = self.state.lock();
        if state.failing_position_reads > 0 {
            state.failing_position_reads -= 1;
            return Err(ExchangeError::Transport("simulated position read failure".into()));
        }
        state.market(symbol)?;
        state.process_maker_fills(symbol);
        let market = state.market_mut(symbol)?;
        let entry = if market.entry_lag > 0 {
            market.entry_lag -= 1;
            None
        } else {
            market.entry
        };
        Ok(Position {
            symbol: symbol.clone(),
            amount: market.amount,
            entry_price: entry,
            leverage: SIM_LEVERAGE,
            margin_type: MarginType::Isolated,
        })
    }

    fn submit_maker(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck> {
        let mut state = self.state.lock();
        let book = state.market(&intent.symbol)?.book;
        if state.reject_makers > 0 {
            state.reject_makers -= 1;
            let err = ExchangeError::WouldImmediatelyMatch(intent.cloid.to_string());
            return Err(state.reject(intent, err));
        }
        let price = intent.price.unwrap_or(Price::ZERO);
        let crosses = match intent.side {
            OrderSide::Buy => price >= book.ask,
            OrderSide::Sell => price <= book.bid,
        };
        if crosses {
            let err = ExchangeError::WouldImmediatelyMatch(intent.cloid.to_string());
            return Err(state.reject(intent, err));
        }
        if intent.reduce_only() && state.reducible(&intent.symbol, intent.side).is_zero() {
            let err = reduce_only_rejected();
            return Err(state.reject(intent, err));
        }
        let ack = state.ack(intent);
        state.resting.push(RestingOrder {
            intent: intent.clone(),
            remaining: intent.quantity.inner(),
            order_id: ack.order_id.unwrap_or_default(),
        });
        state.journal.push(JournalEntry::Placed(intent.clone()));
        Ok(ack)
    }

    fn submit_market(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck> {
        let mut state = self.state.lock();
        let book = state.market(&intent.symbol)?.book;
        if state.market_rejects {
            let err = ExchangeError::Rejected {
                code: -2019,
                msg: "Margin is insufficient.".into(),
            };
            return Err(state.reject(intent, err));
        }
        let mut qty = intent.quantity.inner();
        if intent.reduce_only() {
            let reducible = state.reducible(&intent.symbol, intent.side);
            if reducible.is_zero() {
                let err = reduce_only_rejected();
                return Err(state.reject(intent, err));
            }
            qty = qty.min(reducible);
        }
        state.journal.push(JournalEntry::Placed(intent.clone()));
        let ack = state.ack(intent);
        if state.behavior.market_orders_fill && qty > Decimal::ZERO {
            let price = match intent.side {
                OrderSide::Buy => book.ask,
                OrderSide::Sell => book.bid,
            };
            let order_id = ack.order_id.unwrap_or_default();
            state.apply_fill(&intent.symbol, intent.side, qty, price, TAKER_FEE_RATE, order_id);
        }
        Ok(ack)
    }

    fn submit_trigger(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck> {
        let mut state = self.state.lock();
        state.market(&intent.symbol)?;
        if state.failing_triggers.contains(&intent.kind) {
            let err = ExchangeError::Rejected {
                code: -2021,
                msg: "Order would immediately trigger.".into(),
            };
            return Err(state.reject(intent, err));
        }
        state.triggers.push(intent.clone());
        state.journal.push(JournalEntry::Placed(intent.clone()));
        Ok(state.ack(intent))
    }

    fn cancel(&self, symbol: &Symbol, cloid: &ClientOrderId) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        let before = state.resting.len() + state.triggers.len();
        state
            .resting
            .retain(|o| !(&o.intent.symbol == symbol && &o.intent.cloid == cloid));
        state
            .triggers
            .retain(|t| !(&t.symbol == symbol && &t.cloid == cloid));
        if state.resting.len() + state.triggers.len() == before {
            return Err(ExchangeError::OrderNotFound(cloid.to_string()));
        }
        state.journal.push(JournalEntry::Cancelled {
            symbol: symbol.clone(),
            cloid: cloid.clone(),
        });
        Ok(())
    }

    fn cancel_all(&self, symbol: &Symbol) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        state.market(symbol)?;
        if state.cancel_all_fails {
            return Err(ExchangeError::Transport("simulated cancel-all failure".into()));
        }
        state.resting.retain(|o| &o.intent.symbol != symbol);
        state.triggers.retain(|t| &t.symbol != symbol);
        state.journal.push(JournalEntry::CancelledAll(symbol.clone()));
        Ok(())
    }
}

fn reduce_only_rejected() -> ExchangeError {
    ExchangeError::Rejected {
        code: -2022,
        msg: "ReduceOnly Order is rejected.".into(),
    }
}

impl Exchange for SimExchange {
    fn position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Position>> {
        Box::pin(async move { self.read_position(symbol) })
    }

    fn best_bid_ask<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Bbo>> {
        Box::pin(async move { Ok(self.state.lock().market(symbol)?.book) })
    }

    fn place_maker_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move { self.submit_maker(intent) })
    }

    fn place_market_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move { self.submit_market(intent) })
    }

    fn place_trigger_close_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move { self.submit_trigger(intent) })
    }

    fn cancel_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        cloid: &'a ClientOrderId,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move { self.cancel(symbol, cloid) })
    }

    fn cancel_all_orders<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move { self.cancel_all(symbol) })
    }

    fn symbol_spec<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<SymbolSpec>> {
        Box::pin(async move { Ok(self.state.lock().market(symbol)?.spec.clone()) })
    }

    fn trade_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Fill>>> {
        Box::pin(async move {
            let state = self.state.lock();
            state.market(symbol)?;
            Ok(state
                .fills
                .iter()
                .filter(|f| &f.symbol == symbol && since.map_or(true, |s| f.time >= s))
                .cloned()
                .collect())
        })
    }
}
