//! Increment quantization for prices and quantities.
//!
//! Exchange increments are frequently not powers of two (0.001, 0.1, 5),
//! so everything here works on `rust_decimal::Decimal`. A binary float
//! rounding error of one ulp is enough to push a quantity one step below
//! its intended value and get the order rejected.

use rust_decimal::Decimal;

/// Truncate `value` toward zero to a multiple of `step`.
///
/// A zero step is a no-op. The sign of `step` is ignored.
#[inline]
pub fn floor_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    let step = step.abs();
    match value.checked_div(step) {
        Some(units) => units.trunc() * step,
        None => value,
    }
}

/// Round `value` away from zero to a multiple of `step` whenever truncation
/// would drop a fractional increment.
///
/// Used where a quantity must not fall below a minimum notional.
#[inline]
pub fn ceil_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    let step = step.abs();
    let Some(units) = value.checked_div(step) else {
        return value;
    };
    let whole = units.trunc();
    if whole == units {
        return whole * step;
    }
    if value.is_sign_negative() {
        (whole - Decimal::ONE) * step
    } else {
        (whole + Decimal::ONE) * step
    }
}

/// Half of one increment. Remaining quantities below this are treated as flat.
#[inline]
pub fn half_step(step: Decimal) -> Decimal {
    step.abs() / Decimal::TWO
}
