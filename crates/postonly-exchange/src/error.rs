//! Exchange error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Post-only order would have executed as taker and was rejected.
    #[error("Post-only order would immediately match: {0}")]
    WouldImmediatelyMatch(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Exchange rejected request (code {code}): {msg}")]
    Rejected { code: i64, msg: String },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Spec already loaded for {0}")]
    SpecAlreadyLoaded(String),
}

impl ExchangeError {
    /// Whether retrying the same request later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WouldImmediatelyMatch(_) | Self::RateLimited(_) | Self::Transport(_)
        )
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
