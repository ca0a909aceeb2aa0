//! Ingestion errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use postonly_executor::ExecutorError;
use postonly_telemetry::TelemetryError;
use thiserror::Error;

use crate::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("bad secret")]
    BadSecret,

    #[error("side must be long or short, got {0:?}")]
    InvalidSide(String),

    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("qty must be positive, got {0}")]
    InvalidQuantity(String),

    #[error("invalid exit policy: {0}")]
    InvalidExitPolicy(String),

    #[error(transparent)]
    Execution(#[from] ExecutorError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WebhookResult<T> = Result<T, WebhookError>;

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadSecret => StatusCode::FORBIDDEN,
            Self::InvalidSide(_) | Self::InvalidQuantity(_) | Self::InvalidExitPolicy(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidSymbol(_) | Self::UnknownSymbol(_) => StatusCode::BAD_REQUEST,
            Self::Execution(ExecutorError::UnknownSymbol(_)) => StatusCode::BAD_REQUEST,
            Self::Execution(ExecutorError::InvalidQuantity { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Execution(_) | Self::Telemetry(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Execution(e) if e.is_retriable())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error",
            detail: self.to_string(),
            retriable: self.is_retriable(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postonly_core::{OrderSide, SignalSide, Symbol};
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::BadSecret.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            WebhookError::InvalidSide("up".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            WebhookError::UnknownSymbol("DOGEUSDT".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::from(ExecutorError::UnknownSymbol("X".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_execution_failures_are_server_errors() {
        let unwind = WebhookError::from(ExecutorError::UnwindExhausted {
            symbol: Symbol::new("ETHUSDT").unwrap(),
            side: OrderSide::Sell,
            attempts: 25,
            remaining: dec!(0.5),
            last_error: "timeout".into(),
        });
        assert_eq!(unwind.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!unwind.is_retriable());

        let open = WebhookError::from(ExecutorError::OpenExhausted {
            symbol: Symbol::new("ETHUSDT").unwrap(),
            side: SignalSide::Long,
            attempts: 4,
            last_error: "Margin is insufficient.".into(),
        });
        assert_eq!(open.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(open.is_retriable());
    }
}
