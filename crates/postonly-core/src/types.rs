//! Common data types observed from the exchange.
//!
//! Contains the top-of-book snapshot, the position snapshot and trade
//! history rows.

use crate::market::Symbol;
use crate::order::OrderSide;
use crate::{Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best Bid and Offer (BBO).
///
/// The only view of the remote order book the engine ever takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbo {
    /// Best bid price.
    pub bid: Price,
    /// Best ask price.
    pub ask: Price,
}

impl Bbo {
    pub fn new(bid: Price, ask: Price) -> Self {
        Self { bid, ask }
    }

    /// Calculate mid price: (bid + ask) / 2.
    ///
    /// Returns None if either side is missing.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.bid.is_positive() || !self.ask.is_positive() {
            return None;
        }
        Some(Price::midpoint(self.bid, self.ask))
    }

    /// Bid at or above ask.
    pub fn is_crossed(&self) -> bool {
        self.bid >= self.ask
    }

    /// Calculate spread: ask - bid.
    pub fn spread(&self) -> Price {
        self.ask - self.bid
    }
}

/// Margin mode of a futures position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginType {
    #[default]
    Isolated,
    Cross,
}

/// Position snapshot as reported by the exchange.
///
/// Mutated only by the exchange as fills happen; the engine never keeps an
/// authoritative local copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Positive = long, negative = short, zero = flat.
    pub amount: Decimal,
    /// `None` when flat or not yet reported.
    pub entry_price: Option<Price>,
    pub leverage: u32,
    pub margin_type: MarginType,
}

impl Position {
    pub fn flat(symbol: Symbol) -> Self {
        Self {
            symbol,
            amount: Decimal::ZERO,
            entry_price: None,
            leverage: 0,
            margin_type: MarginType::default(),
        }
    }

    /// Build from a raw snapshot. An entry price of zero means "unknown".
    pub fn from_exchange(
        symbol: Symbol,
        amount: Decimal,
        entry_price: Decimal,
        leverage: u32,
        margin_type: MarginType,
    ) -> Self {
        let entry_price = if amount.is_zero() || entry_price <= Decimal::ZERO {
            None
        } else {
            Some(Price::new(entry_price))
        };
        Self {
            symbol,
            amount,
            entry_price,
            leverage,
            margin_type,
        }
    }

    /// Direction of the position; `None` when flat.
    pub fn side(&self) -> Option<OrderSide> {
        if self.amount > Decimal::ZERO {
            Some(OrderSide::Buy)
        } else if self.amount < Decimal::ZERO {
            Some(OrderSide::Sell)
        } else {
            None
        }
    }

    pub fn abs_size(&self) -> Size {
        Size::new(self.amount.abs())
    }

    /// Quantity held in the direction of `side`; zero if flat or opposite.
    pub fn held_in(&self, side: OrderSide) -> Size {
        match side {
            OrderSide::Buy if self.amount > Decimal::ZERO => Size::new(self.amount),
            OrderSide::Sell if self.amount < Decimal::ZERO => Size::new(-self.amount),
            _ => Size::ZERO,
        }
    }

    /// Quantity held against `side`; zero if flat or same direction.
    pub fn opposing(&self, side: OrderSide) -> Size {
        self.held_in(side.opposite())
    }
}

/// One trade-history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Size,
    pub price: Price,
    /// Fee paid, in quote currency. Positive is a cost.
    pub commission: Decimal,
    /// Realized PnL as reported by the exchange.
    pub realized_pnl: Decimal,
    pub time: DateTime<Utc>,
    pub order_id: u64,
}

impl Fill {
    /// Signed quantity: positive for buys.
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            OrderSide::Buy => self.quantity.inner(),
            OrderSide::Sell => -self.quantity.inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth() -> Symbol {
        Symbol::new("ETHUSDT").unwrap()
    }

    #[test]
    fn test_bbo_mid_and_cross() {
        let bbo = Bbo::new(Price::new(dec!(100.00)), Price::new(dec!(100.01)));
        assert_eq!(bbo.mid_price(), Some(Price::new(dec!(100.005))));
        assert!(!bbo.is_crossed());
        assert_eq!(bbo.spread().inner(), dec!(0.01));

        let crossed = Bbo::new(Price::new(dec!(100.01)), Price::new(dec!(100.01)));
        assert!(crossed.is_crossed());
    }

    #[test]
    fn test_bbo_mid_missing_side() {
        let bbo = Bbo::new(Price::ZERO, Price::new(dec!(100.01)));
        assert_eq!(bbo.mid_price(), None);
    }

    #[test]
    fn test_zero_entry_price_maps_to_none() {
        let pos = Position::from_exchange(eth(), dec!(0.5), dec!(0), 10, MarginType::Isolated);
        assert_eq!(pos.entry_price, None);

        let flat = Position::from_exchange(eth(), dec!(0), dec!(2000), 10, MarginType::Isolated);
        assert_eq!(flat.entry_price, None);
    }

    #[test]
    fn test_position_held_and_opposing() {
        let short = Position::from_exchange(eth(), dec!(-0.3), dec!(2000), 10, MarginType::Isolated);
        assert_eq!(short.side(), Some(OrderSide::Sell));
        assert_eq!(short.held_in(OrderSide::Sell).inner(), dec!(0.3));
        assert_eq!(short.held_in(OrderSide::Buy), Size::ZERO);
        assert_eq!(short.opposing(OrderSide::Buy).inner(), dec!(0.3));
        assert_eq!(Position::flat(eth()).side(), None);
    }
}
