//! Round-trip reconstruction.
//!
//! Fills are replayed per symbol in time order against a signed running
//! position. A trip opens when the position leaves flat and closes when it
//! returns to flat (within half a quantity step). A fill that crosses zero
//! is split: the closing part finishes the current trip and the remainder
//! opens the next one. Trips still open at the end are not reported.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use postonly_core::quantize::half_step;
use postonly_core::{Fill, OrderSide, Price, SignalSide, Size, Symbol};
use postonly_exchange::Exchange;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::ReportResult;

/// One closed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundTrip {
    pub symbol: Symbol,
    pub direction: SignalSide,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Largest absolute size reached.
    pub peak_size: Size,
    /// Volume-weighted price of position-increasing fills.
    pub entry_price: Price,
    /// Volume-weighted price of position-reducing fills.
    pub exit_price: Price,
    /// Sum of exchange-reported realized PnL.
    pub gross_pnl: Decimal,
    pub fees: Decimal,
    pub net_pnl: Decimal,
    pub fills: usize,
}

impl RoundTrip {
    pub fn holding_time(&self) -> chrono::Duration {
        self.closed_at - self.opened_at
    }

    pub fn is_win(&self) -> bool {
        self.net_pnl > Decimal::ZERO
    }
}

/// Totals over a set of round trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub round_trips: usize,
    pub wins: usize,
    pub losses: usize,
    pub gross_pnl: Decimal,
    pub fees: Decimal,
    pub net_pnl: Decimal,
    /// Wins over round trips; `None` without trips.
    pub win_rate: Option<Decimal>,
}

#[derive(Debug)]
struct OpenTrip {
    direction: SignalSide,
    opened_at: DateTime<Utc>,
    /// Signed running position.
    amount: Decimal,
    peak: Decimal,
    entry_qty: Decimal,
    entry_notional: Decimal,
    exit_qty: Decimal,
    exit_notional: Decimal,
    gross: Decimal,
    fees: Decimal,
    fills: usize,
}

impl OpenTrip {
    fn open(side: OrderSide, qty: Decimal, price: Price, fee: Decimal, at: DateTime<Utc>) -> Self {
        let direction = match side {
            OrderSide::Buy => SignalSide::Long,
            OrderSide::Sell => SignalSide::Short,
        };
        let mut trip = Self {
            direction,
            opened_at: at,
            amount: Decimal::ZERO,
            peak: Decimal::ZERO,
            entry_qty: Decimal::ZERO,
            entry_notional: Decimal::ZERO,
            exit_qty: Decimal::ZERO,
            exit_notional: Decimal::ZERO,
            gross: Decimal::ZERO,
            fees: Decimal::ZERO,
            fills: 0,
        };
        trip.increase(side, qty, price, fee);
        trip
    }

    fn adds_to(&self, side: OrderSide) -> bool {
        self.direction.order_side() == side
    }

    fn increase(&mut self, side: OrderSide, qty: Decimal, price: Price, fee: Decimal) {
        self.amount += signed(side, qty);
        self.peak = self.peak.max(self.amount.abs());
        self.entry_qty += qty;
        self.entry_notional += qty * price.inner();
        self.fees += fee;
        self.fills += 1;
    }

    fn reduce(&mut self, side: OrderSide, qty: Decimal, price: Price, fee: Decimal, realized: Decimal) {
        self.amount += signed(side, qty);
        self.exit_qty += qty;
        self.exit_notional += qty * price.inner();
        self.gross += realized;
        self.fees += fee;
        self.fills += 1;
    }

    fn finish(self, symbol: &Symbol, closed_at: DateTime<Utc>) -> RoundTrip {
        RoundTrip {
            symbol: symbol.clone(),
            direction: self.direction,
            opened_at: self.opened_at,
            closed_at,
            peak_size: Size::new(self.peak),
            entry_price: vwap(self.entry_notional, self.entry_qty),
            exit_price: vwap(self.exit_notional, self.exit_qty),
            gross_pnl: self.gross,
            fees: self.fees,
            net_pnl: self.gross - self.fees,
            fills: self.fills,
        }
    }
}

fn signed(side: OrderSide, qty: Decimal) -> Decimal {
    match side {
        OrderSide::Buy => qty,
        OrderSide::Sell => -qty,
    }
}

fn vwap(notional: Decimal, qty: Decimal) -> Price {
    if qty.is_zero() {
        Price::ZERO
    } else {
        Price::new(notional / qty)
    }
}

/// Rebuild closed round trips from `fills`, ordered by close time.
///
/// `step` is the symbol's quantity step; a step of zero requires an exact
/// return to zero.
pub fn reconstruct(fills: &[Fill], step: Size) -> Vec<RoundTrip> {
    let threshold = half_step(step.inner());
    let is_flat = |amount: Decimal| {
        if threshold.is_zero() {
            amount.is_zero()
        } else {
            amount.abs() < threshold
        }
    };

    let mut by_symbol: BTreeMap<&Symbol, Vec<&Fill>> = BTreeMap::new();
    for fill in fills {
        by_symbol.entry(&fill.symbol).or_default().push(fill);
    }

    let mut trips = Vec::new();
    for (symbol, mut fills) in by_symbol {
        fills.sort_by(|a, b| a.time.cmp(&b.time).then(a.order_id.cmp(&b.order_id)));

        let mut open: Option<OpenTrip> = None;
        for fill in fills {
            let qty = fill.quantity.inner();
            if qty <= Decimal::ZERO {
                continue;
            }
            let Some(trip) = open.as_mut() else {
                open = Some(OpenTrip::open(fill.side, qty, fill.price, fill.commission, fill.time));
                continue;
            };
            if trip.adds_to(fill.side) {
                trip.increase(fill.side, qty, fill.price, fill.commission);
                continue;
            }

            let closing = qty.min(trip.amount.abs());
            let closing_fee = fill.commission * closing / qty;
            trip.reduce(fill.side, closing, fill.price, closing_fee, fill.realized_pnl);
            let rest = qty - closing;

            if is_flat(trip.amount) {
                if let Some(done) = open.take() {
                    trips.push(done.finish(symbol, fill.time));
                }
                if !is_flat(rest) && rest > Decimal::ZERO {
                    debug!(%symbol, %rest, "Fill crosses zero, opening next trip");
                    open = Some(OpenTrip::open(
                        fill.side,
                        rest,
                        fill.price,
                        fill.commission - closing_fee,
                        fill.time,
                    ));
                }
            }
        }
        if let Some(trip) = open {
            debug!(%symbol, amount = %trip.amount, "Open trip left out of report");
        }
    }

    trips.sort_by(|a, b| a.closed_at.cmp(&b.closed_at));
    trips
}

pub fn summarize(trips: &[RoundTrip]) -> ReportSummary {
    let mut summary = ReportSummary {
        round_trips: trips.len(),
        ..ReportSummary::default()
    };
    for trip in trips {
        summary.gross_pnl += trip.gross_pnl;
        summary.fees += trip.fees;
        summary.net_pnl += trip.net_pnl;
        if trip.net_pnl > Decimal::ZERO {
            summary.wins += 1;
        } else if trip.net_pnl < Decimal::ZERO {
            summary.losses += 1;
        }
    }
    if !trips.is_empty() {
        summary.win_rate = Some(Decimal::from(summary.wins) / Decimal::from(trips.len()));
    }
    summary
}

/// Pull trade history for `symbol` and rebuild its round trips.
pub async fn fetch_round_trips(
    exchange: &dyn Exchange,
    symbol: &Symbol,
    since: Option<DateTime<Utc>>,
) -> ReportResult<Vec<RoundTrip>> {
    let spec = exchange.symbol_spec(symbol).await?;
    let fills = exchange.trade_history(symbol, since).await?;
    debug!(%symbol, fills = fills.len(), "Trade history loaded");
    Ok(reconstruct(&fills, spec.step_size))
}
