//! Core domain types for the post-only signal execution bot.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: Precision-safe numeric types and step quantization
//! - `Symbol`, `SymbolSpec`: Contract identity and trading increments
//! - `OrderSide`, `OrderKind`, `OrderIntent`: What gets sent to the exchange
//! - `Position`, `Bbo`, `Fill`: What is observed from the exchange
//! - `ExecutionResult`: What the engine reports back

pub mod clock;
pub mod decimal;
pub mod error;
pub mod execution;
pub mod market;
pub mod order;
pub mod quantize;
pub mod signal;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::{Symbol, SymbolSpec};
pub use order::{ClientOrderId, OrderAck, OrderIntent, OrderKind, OrderSide};
pub use signal::{SignalClass, SignalRequest, SignalSide};
pub use types::{Bbo, Fill, MarginType, Position};

pub use execution::{ExecutionMode, ExecutionResult, ExitLegOutcome, ExitReport, UnwindReport};
