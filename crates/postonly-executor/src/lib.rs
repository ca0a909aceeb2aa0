//! Post-only signal execution engine.
//!
//! Turns a directional signal into a position on the exchange: unwind
//! whatever opposes it, open with post-only orders at the touch (or market
//! orders when the signal stream is noisy), then protect the position with
//! take-profit and stop-loss triggers.
//!
//! # Key Components
//!
//! - [`ExecutionEngine`]: the per-signal state machine
//! - [`SymbolLocks`]: one in-flight execution per symbol
//! - [`ExecutorConfig`] / [`ExitPolicy`]: timing, sizing and exit settings
//! - [`maker_price`]: join-the-touch quoting

pub mod config;
pub mod engine;
mod entry;
pub mod error;
pub mod exits;
pub mod locks;
pub mod quote;
mod session;
mod unwind;

pub use config::{ExecutorConfig, ExitPolicy};
pub use engine::ExecutionEngine;
pub use error::{ExecutorError, ExecutorResult};
pub use exits::trigger_price;
pub use locks::SymbolLocks;
pub use quote::maker_price;
