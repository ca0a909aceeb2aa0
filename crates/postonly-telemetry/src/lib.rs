//! Prometheus metrics and structured logging for the post-only execution bot.
//!
//! - Prometheus counters for signals, executions, unwinds and exit legs
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::Metrics;
