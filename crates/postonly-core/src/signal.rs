//! Directional trade signals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::market::Symbol;
use crate::order::OrderSide;
use crate::Size;

/// Requested direction of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSide {
    Long,
    Short,
}

impl SignalSide {
    /// Side of the order that opens this exposure.
    pub fn order_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for SignalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalSide {
    type Err = CoreError;

    /// Accepts `long`/`buy` and `short`/`sell`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            _ => Err(CoreError::InvalidSide(s.to_string())),
        }
    }
}

/// Arbiter verdict for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalClass {
    /// Maker-first execution.
    Calm,
    /// Market-only execution.
    Noisy,
}

impl SignalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Noisy => "noisy",
        }
    }
}

impl fmt::Display for SignalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution request after ingestion-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub symbol: Symbol,
    pub side: SignalSide,
    /// Falls back to the configured default quantity when absent.
    pub quantity: Option<Size>,
}

impl SignalRequest {
    pub fn new(symbol: Symbol, side: SignalSide) -> Self {
        Self {
            symbol,
            side,
            quantity: None,
        }
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: Size) -> Self {
        self.quantity = Some(quantity);
        self
    }
}
