//! `Price` and `Size` newtypes over `rust_decimal::Decimal`.
//!
//! Order parameters never touch binary floats. The two types share their
//! arithmetic through `decimal_newtype!` and differ only in the increment
//! they quantize to (tick vs. step).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

use crate::quantize::{ceil_to_step, floor_to_step};

macro_rules! decimal_newtype {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);

            #[inline]
            pub fn new(value: Decimal) -> Self {
                Self(value)
            }

            #[inline]
            pub fn inner(&self) -> Decimal {
                self.0
            }

            #[inline]
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            /// Strictly greater than zero.
            #[inline]
            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }
        }

        /// Trailing zeros are dropped: `100.500` renders as `100.5`.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.normalize(), f)
            }
        }

        impl FromStr for $name {
            type Err = rust_decimal::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Decimal::from_str(s.trim()).map(Self)
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<Decimal> for $name {
            type Output = Self;

            fn mul(self, factor: Decimal) -> Self {
                Self(self.0 * factor)
            }
        }
    };
}

/// Order or trigger price, quoted in the symbol's quote asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

decimal_newtype!(Price);

impl Price {
    /// Truncate to the exchange tick size.
    #[inline]
    pub fn floor_to_tick(&self, tick_size: Price) -> Self {
        Self(floor_to_step(self.0, tick_size.0))
    }

    #[inline]
    pub fn midpoint(a: Price, b: Price) -> Self {
        Self((a.0 + b.0) / Decimal::TWO)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, divisor: Decimal) -> Self {
        Self(self.0 / divisor)
    }
}

/// Order quantity in base-asset units.
///
/// Always non-negative; direction lives in `OrderSide` or in the signed
/// position amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Size(pub Decimal);

decimal_newtype!(Size);

impl Size {
    /// Round down to the quantity step.
    #[inline]
    pub fn floor_to_step(&self, step: Size) -> Self {
        Self(floor_to_step(self.0, step.0))
    }

    /// Round up to the quantity step.
    #[inline]
    pub fn ceil_to_step(&self, step: Size) -> Self {
        Self(ceil_to_step(self.0, step.0))
    }

    /// Quote-asset value at `price`.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }

    /// `self - rhs`, clamped at zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Size) -> Self {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_and_step_rounding() {
        assert_eq!(
            Price::new(dec!(3001.237)).floor_to_tick(Price::new(dec!(0.01))),
            Price::new(dec!(3001.23))
        );

        let qty = Size::new(dec!(0.0416));
        let step = Size::new(dec!(0.001));
        assert_eq!(qty.floor_to_step(step), Size::new(dec!(0.041)));
        assert_eq!(qty.ceil_to_step(step), Size::new(dec!(0.042)));
    }

    #[test]
    fn test_min_notional_arithmetic() {
        // 0.05 ETH at the ask is just above a 5 USDT minimum
        let notional = Size::new(dec!(0.05)).notional(Price::new(dec!(100.01)));
        assert_eq!(notional, dec!(5.0005));
    }

    #[test]
    fn test_midpoint() {
        let mid = Price::midpoint(Price::new(dec!(100.00)), Price::new(dec!(100.01)));
        assert_eq!(mid.0, dec!(100.005));
    }

    #[test]
    fn test_saturating_sub() {
        let filled = Size::new(dec!(0.6));
        let target = Size::new(dec!(1.0));
        assert_eq!(target.saturating_sub(filled), Size::new(dec!(0.4)));
        assert_eq!(filled.saturating_sub(target), Size::ZERO);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(" 0.0100 ".parse::<Size>().unwrap().to_string(), "0.01");
        assert_eq!(Price::new(dec!(100.500)).to_string(), "100.5");
        assert!("abc".parse::<Price>().is_err());
        assert!(!Size::ZERO.is_positive());
        assert!(Price::new(dec!(0.01)).is_positive());
    }

    #[test]
    fn test_size_default_is_zero() {
        assert_eq!(Size::default(), Size::ZERO);
    }
}
