//! Market identification and specification types.
//!
//! A futures contract is addressed by its exchange symbol (`BTCUSDT`). Its
//! trading increments come from exchange metadata and are loaded once at
//! startup.

use crate::error::{CoreError, Result};
use crate::quantize::{ceil_to_step, floor_to_step, half_step};
use crate::{Price, Size};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange symbol, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol. Only ASCII alphanumerics are accepted.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidSymbol(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-symbol trading increments.
///
/// Immutable once loaded; see `SpecCache` in the exchange crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum quantity increment.
    pub step_size: Size,
    /// Minimum order notional in quote currency.
    pub min_notional: Decimal,
}

impl Default for SymbolSpec {
    /// Fallback increments used when exchange metadata omits a filter.
    fn default() -> Self {
        Self {
            tick_size: Price::new(dec!(0.01)),
            step_size: Size::new(dec!(0.001)),
            min_notional: dec!(5),
        }
    }
}

impl SymbolSpec {
    pub fn new(tick_size: Price, step_size: Size, min_notional: Decimal) -> Self {
        Self {
            tick_size,
            step_size,
            min_notional,
        }
    }

    #[inline]
    pub fn floor_price(&self, price: Price) -> Price {
        price.floor_to_tick(self.tick_size)
    }

    #[inline]
    pub fn floor_qty(&self, qty: Size) -> Size {
        qty.floor_to_step(self.step_size)
    }

    /// Below this a remaining quantity is considered flat.
    #[inline]
    pub fn flat_threshold(&self) -> Decimal {
        half_step(self.step_size.inner())
    }

    /// Whether a signed position amount is flat for this symbol.
    #[inline]
    pub fn is_flat(&self, amount: Decimal) -> bool {
        amount.abs() < self.flat_threshold()
    }

    /// Floor `qty` to the step, then raise it to the smallest step multiple
    /// whose notional at `price` reaches `min_notional`.
    ///
    /// A non-positive price disables the notional check.
    pub fn min_notional_quantity(&self, qty: Size, price: Price) -> Size {
        let floored = self.floor_qty(qty);
        if !price.is_positive() || self.min_notional <= Decimal::ZERO {
            return floored;
        }
        let needed = ceil_to_step(self.min_notional / price.inner(), self.step_size.inner());
        if needed > floored.inner() {
            Size::new(needed)
        } else {
            floored
        }
    }

    /// Smallest orderable quantity: one step.
    #[inline]
    pub fn one_step(&self) -> Size {
        self.step_size
    }

    /// Truncate an arbitrary decimal to the quantity step.
    #[inline]
    pub fn floor_amount(&self, amount: Decimal) -> Decimal {
        floor_to_step(amount, self.step_size.inner())
    }
}
