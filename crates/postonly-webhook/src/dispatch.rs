//! Signal dispatch: validate, classify, execute.

use std::sync::Arc;

use postonly_arbiter::SignalArbiter;
use postonly_core::{ExecutionResult, SignalRequest, SignalSide, Size, Symbol};
use postonly_executor::ExecutionEngine;
use postonly_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{WebhookError, WebhookResult};

/// Routes validated signals through the arbiter into the engine.
pub struct SignalDispatcher {
    arbiter: Arc<SignalArbiter>,
    engine: Arc<ExecutionEngine>,
    default_symbol: String,
}

impl SignalDispatcher {
    pub fn new(
        arbiter: Arc<SignalArbiter>,
        engine: Arc<ExecutionEngine>,
        default_symbol: impl Into<String>,
    ) -> Self {
        Self {
            arbiter,
            engine,
            default_symbol: default_symbol.into(),
        }
    }

    pub fn arbiter(&self) -> &SignalArbiter {
        &self.arbiter
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Build a request from raw payload fields.
    ///
    /// Rejects before the arbiter sees anything, so malformed payloads never
    /// count toward the signal window.
    pub fn parse_request(
        &self,
        symbol: Option<&str>,
        side: &str,
        quantity: Option<Decimal>,
    ) -> WebhookResult<SignalRequest> {
        let side: SignalSide = side
            .parse()
            .map_err(|_| WebhookError::InvalidSide(side.to_string()))?;

        let raw = symbol
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.default_symbol);
        let symbol = Symbol::new(raw).map_err(|_| WebhookError::InvalidSymbol(raw.to_string()))?;
        if !self.engine.specs().contains(&symbol) {
            return Err(WebhookError::UnknownSymbol(symbol.to_string()));
        }

        let mut request = SignalRequest::new(symbol, side);
        if let Some(qty) = quantity {
            if qty <= Decimal::ZERO {
                return Err(WebhookError::InvalidQuantity(qty.to_string()));
            }
            request = request.with_quantity(Size::new(qty));
        }
        Ok(request)
    }

    /// Classify and execute one signal.
    pub async fn dispatch(&self, request: SignalRequest) -> WebhookResult<ExecutionResult> {
        let class = self.arbiter.classify(request.side);
        Metrics::arbiter_latched(self.arbiter.snapshot().latched);
        debug!(symbol = %request.symbol, side = %request.side, %class, "Signal classified");

        let result = self.engine.execute_signal(&request, class).await?;
        if result.filled {
            self.arbiter.note_successful_open();
        }
        info!(
            symbol = %result.symbol,
            side = %result.side,
            mode = %result.mode,
            filled = result.filled,
            "Signal dispatched"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SignalDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDispatcher")
            .field("default_symbol", &self.default_symbol)
            .field("engine", &self.engine)
            .finish()
    }
}
