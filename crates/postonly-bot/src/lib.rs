//! Post-only signal execution bot.
//!
//! Main application that orchestrates all components:
//! - Symbol spec preflight and account setup
//! - Signal arbiter and execution engine
//! - HTTP signal ingestion
//! - Round-trip reporting

pub mod app;
pub mod config;
pub mod error;
pub mod report;

pub use app::{Application, ExchangeMode};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
