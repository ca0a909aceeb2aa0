//! Signal rate arbiter.
//!
//! Decides per incoming signal whether execution can afford to be patient
//! (maker orders) or must be fast (market orders):
//! - too many signals inside the window
//! - too many direction flips inside the window
//! - a new signal too soon after the last successful open
//!
//! Any of these latches noisy mode for a hysteresis period.

pub mod arbiter;
pub mod config;

pub use arbiter::{ArbiterSnapshot, SignalArbiter};
pub use config::ArbiterConfig;
