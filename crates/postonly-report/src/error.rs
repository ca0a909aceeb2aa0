//! Report error types.

use postonly_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

pub type ReportResult<T> = Result<T, ReportError>;
