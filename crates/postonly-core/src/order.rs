//! Order-related types and identifiers.
//!
//! Provides order side, order kind, client order IDs and the order intent
//! handed to the exchange binding.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::market::Symbol;
use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    /// Exchange wire representation.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// What an order is for. Determines its client id prefix and whether it may
/// only reduce exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    MakerOpen,
    MakerClose,
    MarketOpen,
    MarketClose,
    TakeProfit,
    StopLoss,
}

impl OrderKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::MakerOpen => "open",
            Self::MakerClose => "close",
            Self::MarketOpen => "open-mkt",
            Self::MarketClose => "close-mkt",
            Self::TakeProfit => "tp",
            Self::StopLoss => "sl",
        }
    }

    /// Close kinds are reduce-only.
    pub fn is_reduce_only(&self) -> bool {
        matches!(self, Self::MakerClose | Self::MarketClose)
    }

    /// Trigger kinds close the whole position when touched.
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::TakeProfit | Self::StopLoss)
    }

    pub fn is_maker(&self) -> bool {
        matches!(self, Self::MakerOpen | Self::MakerClose)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MakerOpen => "maker_open",
            Self::MakerClose => "maker_close",
            Self::MarketOpen => "market_open",
            Self::MarketClose => "market_close",
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
        };
        f.write_str(s)
    }
}

/// Client order ID for idempotency.
///
/// Every submission gets a fresh id so a retried request can never be
/// confused with an earlier one. Format: `{kind-prefix}-{12 hex chars}`,
/// well inside the exchange's 36 character limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    const HEX_LEN: usize = 12;

    /// Create a new unique client order ID for `kind`.
    pub fn new(kind: OrderKind) -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", kind.prefix(), &hex[..Self::HEX_LEN]))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An order the engine wants placed.
///
/// Lives only for the duration of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub cloid: ClientOrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub kind: OrderKind,
    /// Zero for trigger orders, which close the full position.
    pub quantity: Size,
    /// Limit price (maker kinds only).
    pub price: Option<Price>,
    /// Trigger price (take-profit / stop-loss only).
    pub trigger_price: Option<Price>,
}

impl OrderIntent {
    /// Post-only limit order. `reduce_only` selects the close kind.
    #[must_use]
    pub fn maker(
        symbol: Symbol,
        side: OrderSide,
        quantity: Size,
        price: Price,
        reduce_only: bool,
    ) -> Self {
        let kind = if reduce_only {
            OrderKind::MakerClose
        } else {
            OrderKind::MakerOpen
        };
        Self {
            cloid: ClientOrderId::new(kind),
            symbol,
            side,
            kind,
            quantity,
            price: Some(price),
            trigger_price: None,
        }
    }

    /// Market order. `reduce_only` selects the close kind.
    #[must_use]
    pub fn market(symbol: Symbol, side: OrderSide, quantity: Size, reduce_only: bool) -> Self {
        let kind = if reduce_only {
            OrderKind::MarketClose
        } else {
            OrderKind::MarketOpen
        };
        Self {
            cloid: ClientOrderId::new(kind),
            symbol,
            side,
            kind,
            quantity,
            price: None,
            trigger_price: None,
        }
    }

    /// Full-position-closing trigger order.
    ///
    /// `kind` must be `TakeProfit` or `StopLoss`; any other kind is coerced
    /// to `StopLoss`.
    #[must_use]
    pub fn trigger_close(
        symbol: Symbol,
        side: OrderSide,
        kind: OrderKind,
        trigger_price: Price,
    ) -> Self {
        let kind = if kind.is_trigger() {
            kind
        } else {
            OrderKind::StopLoss
        };
        Self {
            cloid: ClientOrderId::new(kind),
            symbol,
            side,
            kind,
            quantity: Size::ZERO,
            price: None,
            trigger_price: Some(trigger_price),
        }
    }

    #[inline]
    pub fn reduce_only(&self) -> bool {
        self.kind.is_reduce_only()
    }
}

/// Exchange acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub cloid: ClientOrderId,
    /// Exchange-assigned id, when the venue reports one.
    pub order_id: Option<u64>,
}
