//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] postonly_exchange::ExchangeError),

    #[error("Server error: {0}")]
    Webhook(#[from] postonly_webhook::WebhookError),

    #[error("Report error: {0}")]
    Report(#[from] postonly_report::ReportError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] postonly_telemetry::TelemetryError),

    #[error("Preflight error: {0}")]
    Preflight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
