//! Executor error types.

use postonly_core::{OrderSide, SignalSide, Symbol};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Invalid quantity for {symbol}: {quantity}")]
    InvalidQuantity { symbol: Symbol, quantity: Decimal },

    /// Opposite position could not be flattened. Never retried by callers.
    #[error(
        "Unwind {side} {symbol} exhausted after {attempts} attempts ({remaining} still open): {last_error}"
    )]
    UnwindExhausted {
        symbol: Symbol,
        /// Side of the closing orders.
        side: OrderSide,
        attempts: u32,
        remaining: Decimal,
        last_error: String,
    },

    /// Opening leg gave up; the signal may be retried.
    #[error("Open {side} {symbol} exhausted after {attempts} attempts: {last_error}")]
    OpenExhausted {
        symbol: Symbol,
        side: SignalSide,
        attempts: u32,
        last_error: String,
    },
}

impl ExecutorError {
    /// Whether the caller may resend the same signal.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::OpenExhausted { .. })
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::UnknownSymbol(_) => None,
            Self::InvalidQuantity { symbol, .. }
            | Self::UnwindExhausted { symbol, .. }
            | Self::OpenExhausted { symbol, .. } => Some(symbol),
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth() -> Symbol {
        Symbol::new("ETHUSDT").unwrap()
    }

    #[test]
    fn test_only_open_exhaustion_is_retriable() {
        let open = ExecutorError::OpenExhausted {
            symbol: eth(),
            side: SignalSide::Long,
            attempts: 4,
            last_error: "timeout".into(),
        };
        let unwind = ExecutorError::UnwindExhausted {
            symbol: eth(),
            side: OrderSide::Buy,
            attempts: 25,
            remaining: dec!(0.3),
            last_error: "timeout".into(),
        };
        assert!(open.is_retriable());
        assert!(!unwind.is_retriable());
        assert!(!ExecutorError::UnknownSymbol("X".into()).is_retriable());
    }

    #[test]
    fn test_message_carries_context() {
        let err = ExecutorError::UnwindExhausted {
            symbol: eth(),
            side: OrderSide::Buy,
            attempts: 25,
            remaining: dec!(0.3),
            last_error: "close timeout".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ETHUSDT"));
        assert!(msg.contains("buy"));
        assert!(msg.contains("25"));
        assert_eq!(err.symbol(), Some(&eth()));
    }
}
