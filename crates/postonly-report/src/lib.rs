//! Read-only trade reporting.
//!
//! Rebuilds closed positions (flat -> open -> flat) from the exchange's
//! trade history and summarizes their PnL. Shares no state with the live
//! engine.

pub mod error;
pub mod round_trip;

pub use error::{ReportError, ReportResult};
pub use round_trip::{fetch_round_trips, reconstruct, summarize, ReportSummary, RoundTrip};
