//! Request and response bodies for the ingestion routes.

use postonly_arbiter::ArbiterSnapshot;
use postonly_core::{ExecutionResult, Symbol};
use postonly_executor::ExitPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// TradingView alert payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TvWebhookBody {
    #[serde(default)]
    pub symbol: Option<String>,
    pub side: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Manual trade payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualTradeBody {
    #[serde(default)]
    pub symbol: Option<String>,
    pub side: String,
    /// Overrides the configured default quantity.
    #[serde(default)]
    pub qty: Option<Decimal>,
}

/// Successful execution response.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedResponse {
    /// Always "ok".
    pub status: &'static str,
    pub symbol: Symbol,
    /// "long" or "short".
    pub action: &'static str,
    pub result: ExecutionResult,
}

impl ExecutedResponse {
    pub fn new(result: ExecutionResult) -> Self {
        Self {
            status: "ok",
            symbol: result.symbol.clone(),
            action: result.side.as_str(),
            result,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: &'static str,
    pub detail: String,
    /// Whether re-sending the same signal may succeed.
    pub retriable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Runtime status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Unix milliseconds.
    pub timestamp_ms: i64,
    pub arbiter: ArbiterSnapshot,
    pub exit_policy: ExitPolicy,
    pub symbols: Vec<Symbol>,
    /// Symbols with an execution in flight.
    pub busy: Vec<Symbol>,
}
