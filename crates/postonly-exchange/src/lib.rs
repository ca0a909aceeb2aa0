//! Exchange capability interface for the post-only execution bot.
//!
//! - `Exchange`: the trait the execution engine drives
//! - `BinanceFutures`: signed REST binding for Binance USD-M futures
//! - `SimExchange`: deterministic in-memory venue for tests and paper mode
//! - `SpecCache`: per-symbol trading increments, loaded once at startup

pub mod binance;
pub mod error;
pub mod exchange;
pub mod signer;
pub mod sim;
pub mod spec_cache;
pub mod wire;

pub use binance::{BinanceConfig, BinanceFutures};
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{BoxFuture, DynExchange, Exchange};
pub use signer::ApiCredentials;
pub use sim::{JournalEntry, SimBehavior, SimExchange};
pub use spec_cache::SpecCache;
