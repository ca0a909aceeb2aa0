//! Opening leg.
//!
//! Calm signals try post-only orders at the touch for a few attempts, each
//! sized to what is still missing, then top up the remainder with one market
//! order. Noisy signals go straight to market.

use postonly_core::{
    ExecutionMode, OrderIntent, OrderSide, Position, Price, SignalClass, SignalSide, Size,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{ExecutorError, ExecutorResult};
use crate::quote::{maker_price, reference_price};
use crate::session::SymbolSession;

/// What the opening leg ended with.
#[derive(Debug, Clone)]
pub(crate) struct EntryOutcome {
    pub mode: ExecutionMode,
    pub filled: bool,
    pub attempts: u32,
    pub target: Size,
    pub position: Option<Position>,
}

impl EntryOutcome {
    pub fn held(&self, side: OrderSide) -> Size {
        self.position.as_ref().map_or(Size::ZERO, |p| p.held_in(side))
    }

    pub fn entry_price(&self) -> Option<Price> {
        self.position.as_ref().and_then(|p| p.entry_price)
    }
}

pub(crate) struct Opener<'s, 'a> {
    session: &'s SymbolSession<'a>,
    signal: SignalSide,
    side: OrderSide,
    target: Size,
}

impl<'s, 'a> Opener<'s, 'a> {
    /// Size the target from the requested quantity and the current book.
    ///
    /// The requested quantity is floored to the step and raised to the
    /// minimum notional at the far touch. Without a book the floored
    /// quantity is used, and never less than one step.
    pub async fn new(
        session: &'s SymbolSession<'a>,
        signal: SignalSide,
        requested: Size,
    ) -> Self {
        let side = signal.order_side();
        let spec = session.spec;
        let mut target = match session.quote().await {
            Ok(bbo) => spec.min_notional_quantity(requested, reference_price(&bbo, side)),
            Err(e) => {
                warn!(symbol = %session.symbol, error = %e, "Quote for sizing failed");
                spec.floor_qty(requested)
            }
        };
        if target.is_zero() {
            target = spec.one_step();
        }
        Self {
            session,
            signal,
            side,
            target,
        }
    }

    fn target_met(&self, position: &Position) -> bool {
        position.held_in(self.side).inner() >= self.target.inner() * self.session.config.fill_ratio
    }

    fn missing(&self, position: Option<&Position>) -> Size {
        let held = position.map_or(Size::ZERO, |p| p.held_in(self.side));
        self.target.saturating_sub(held)
    }

    /// Order size for what is missing.
    ///
    /// A fresh open keeps the minimum-notional raise. A remainder left by
    /// partial fills is never inflated: below the minimum notional at `price`
    /// it is not orderable and `None` is returned. A non-positive price skips
    /// the notional check.
    fn order_size(&self, missing: Size, price: Price) -> Option<Size> {
        let spec = self.session.spec;
        if missing >= self.target {
            let qty = spec.min_notional_quantity(missing, price);
            return Some(if qty.is_zero() { spec.one_step() } else { qty });
        }
        let qty = spec.floor_qty(missing);
        if qty.is_zero() || (price.is_positive() && qty.notional(price) < spec.min_notional) {
            return None;
        }
        Some(qty)
    }

    /// Stop short of the target: the remainder is too small to order.
    fn short_of_target(
        &self,
        mode: ExecutionMode,
        attempts: u32,
        missing: Size,
        position: Option<Position>,
    ) -> EntryOutcome {
        warn!(
            symbol = %self.session.symbol,
            side = %self.signal,
            %missing,
            min_notional = %self.session.spec.min_notional,
            "Remainder below minimum notional, leaving position short of target"
        );
        self.outcome(mode, attempts, position)
    }

    fn outcome(&self, mode: ExecutionMode, attempts: u32, position: Option<Position>) -> EntryOutcome {
        let filled = position.as_ref().is_some_and(|p| self.target_met(p));
        EntryOutcome {
            mode,
            filled,
            attempts,
            target: self.target,
            position,
        }
    }

    pub async fn run(&self, class: SignalClass) -> ExecutorResult<EntryOutcome> {
        let mode = match class {
            SignalClass::Calm => ExecutionMode::Maker,
            SignalClass::Noisy => ExecutionMode::Market,
        };

        let current = self.session.position().await.ok();
        if let Some(pos) = current.as_ref().filter(|p| self.target_met(p)) {
            info!(
                symbol = %self.session.symbol,
                side = %self.signal,
                held = %pos.held_in(self.side),
                target = %self.target,
                "Target already held, no order sent"
            );
            return Ok(self.outcome(mode, 0, current));
        }

        match class {
            SignalClass::Noisy => self.market_only(current).await,
            SignalClass::Calm => self.maker_then_top_up().await,
        }
    }

    async fn market_only(&self, current: Option<Position>) -> ExecutorResult<EntryOutcome> {
        let session = self.session;
        let missing = self.missing(current.as_ref());
        let price = match session.quote().await {
            Ok(bbo) => reference_price(&bbo, self.side),
            Err(_) => Price::ZERO,
        };
        let Some(qty) = self.order_size(missing, price) else {
            return Ok(self.short_of_target(ExecutionMode::Market, 0, missing, current));
        };
        info!(
            symbol = %session.symbol,
            side = %self.signal,
            %qty,
            target = %self.target,
            "Noisy signal, opening with market order"
        );

        let order = OrderIntent::market(session.symbol.clone(), self.side, qty, false);
        if let Err(e) = session.submit(&order).await {
            warn!(symbol = %session.symbol, side = %self.signal, attempt = 1, error = %e, "Market open rejected");
            return Err(self.exhausted(1, e.to_string()));
        }
        let position = self.settle(current).await;
        Ok(self.outcome(ExecutionMode::Market, 1, position))
    }

    async fn maker_then_top_up(&self) -> ExecutorResult<EntryOutcome> {
        let session = self.session;
        let symbol = session.symbol;
        let mut attempts = 0u32;
        let mut last_error = String::from("no attempt made");
        let mut last_position: Option<Position> = None;

        for attempt in 1..=session.config.max_open_attempts {
            match session.position().await {
                Ok(pos) => {
                    if self.target_met(&pos) {
                        let position = self.settle(Some(pos)).await;
                        return Ok(self.outcome(ExecutionMode::Maker, attempts, position));
                    }
                    last_position = Some(pos);
                }
                Err(e) => {
                    warn!(%symbol, side = %self.signal, attempt, error = %e, "Entry position read failed");
                    last_error = e.to_string();
                    session.pause().await;
                    continue;
                }
            }

            let bbo = match session.quote().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(%symbol, side = %self.signal, attempt, error = %e, "Entry quote failed");
                    last_error = e.to_string();
                    session.pause().await;
                    continue;
                }
            };
            let price = maker_price(&bbo, self.side, session.spec.tick_size);
            let missing = self.missing(last_position.as_ref());
            let Some(qty) = self.order_size(missing, price) else {
                return Ok(self.short_of_target(ExecutionMode::Maker, attempts, missing, last_position));
            };
            let order = OrderIntent::maker(symbol.clone(), self.side, qty, price, false);
            attempts += 1;
            debug!(%symbol, side = %self.signal, attempt = attempts, %qty, %price, "Placing maker open");

            match session.submit(&order).await {
                Ok(()) => {
                    let (pos, met) = session
                        .poll_position(session.config.open_attempt_timeout(), |p| self.target_met(p))
                        .await;
                    if pos.is_some() {
                        last_position = pos;
                    }
                    if met {
                        info!(%symbol, side = %self.signal, attempts, %price, "Maker open filled");
                        let position = self.settle(last_position).await;
                        return Ok(self.outcome(ExecutionMode::Maker, attempts, position));
                    }
                    session.cancel_quietly(&order.cloid).await;
                    last_error = format!("maker open {} not filled in time", order.cloid);
                }
                Err(e) => {
                    debug!(%symbol, side = %self.signal, attempt = attempts, error = %e, "Maker open rejected, requoting");
                    last_error = e.to_string();
                }
            }
            session.pause().await;
        }

        self.top_up(attempts, last_error, last_position).await
    }

    /// Market order for exactly what the maker attempts left missing.
    async fn top_up(
        &self,
        maker_attempts: u32,
        last_error: String,
        last_position: Option<Position>,
    ) -> ExecutorResult<EntryOutcome> {
        let session = self.session;
        let symbol = session.symbol;

        // A cancelled maker order may still have filled.
        let current = session.position().await.ok().or(last_position);
        if let Some(pos) = current.as_ref().filter(|p| self.target_met(p)) {
            let position = self.settle(Some(pos.clone())).await;
            return Ok(self.outcome(ExecutionMode::Maker, maker_attempts, position));
        }

        let missing = self.missing(current.as_ref());
        let price = match session.quote().await {
            Ok(bbo) => reference_price(&bbo, self.side),
            Err(_) => Price::ZERO,
        };
        let Some(qty) = self.order_size(missing, price) else {
            return Ok(self.short_of_target(ExecutionMode::Maker, maker_attempts, missing, current));
        };
        let attempts = maker_attempts + 1;
        info!(
            %symbol,
            side = %self.signal,
            maker_attempts,
            %missing,
            %qty,
            last_error = %last_error,
            "Maker attempts exhausted, topping up with market order"
        );

        let order = OrderIntent::market(symbol.clone(), self.side, qty, false);
        if let Err(e) = session.submit(&order).await {
            warn!(%symbol, side = %self.signal, attempt = attempts, error = %e, "Market top-up rejected");
            return Err(self.exhausted(attempts, format!("{last_error}; top-up: {e}")));
        }
        let position = self.settle(current).await;
        Ok(self.outcome(ExecutionMode::MarketFallback, attempts, position))
    }

    /// Wait until the target is held and the entry price is reported.
    ///
    /// The exchange may report the entry price well after the fill. Gives up
    /// after the settle timeout and returns the freshest snapshot.
    async fn settle(&self, fallback: Option<Position>) -> Option<Position> {
        if fallback
            .as_ref()
            .is_some_and(|p| self.target_met(p) && p.entry_price.is_some())
        {
            return fallback;
        }
        let (pos, settled) = self
            .session
            .poll_position(self.session.config.entry_settle_timeout(), |p| {
                self.target_met(p) && p.entry_price.is_some()
            })
            .await;
        if !settled {
            debug!(
                symbol = %self.session.symbol,
                side = %self.signal,
                "Entry did not settle within timeout"
            );
        }
        pos.or(fallback)
    }

    fn exhausted(&self, attempts: u32, last_error: String) -> ExecutorError {
        ExecutorError::OpenExhausted {
            symbol: self.session.symbol.clone(),
            side: self.signal,
            attempts,
            last_error,
        }
    }
}

/// Requested quantity, defaulted and validated.
pub(crate) fn requested_quantity(requested: Option<Size>, default: Decimal) -> Option<Size> {
    let qty = requested.unwrap_or(Size::new(default));
    qty.is_positive().then_some(qty)
}
