//! HTTP server implementation using axum.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use postonly_executor::ExitPolicy;
use postonly_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::WebhookConfig;
use crate::dispatch::SignalDispatcher;
use crate::error::{WebhookError, WebhookResult};
use crate::types::{
    ExecutedResponse, HealthResponse, ManualTradeBody, StatusResponse, TvWebhookBody,
};

/// Header carrying the shared secret on administrative routes.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<SignalDispatcher>,
    config: Arc<WebhookConfig>,
}

impl AppState {
    pub fn new(dispatcher: Arc<SignalDispatcher>, config: WebhookConfig) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
        }
    }

    fn secret_matches(&self, provided: Option<&str>) -> bool {
        self.config.secret_matches(provided)
    }

    fn header_secret_matches(&self, headers: &HeaderMap) -> bool {
        self.secret_matches(headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()))
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/tv/webhook", post(tv_webhook))
        .route("/trade/manual", post(manual_trade))
        .route("/exits", get(get_exits).put(put_exits))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Count the request and render the outcome.
fn respond<T: Serialize>(route: &str, result: WebhookResult<T>) -> Response {
    let response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            warn!(route, error = %e, "Request failed");
            e.into_response()
        }
    };
    Metrics::http_request(route, response.status().as_u16());
    response
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// TradingView alert intake.
async fn tv_webhook(State(state): State<AppState>, Json(body): Json<TvWebhookBody>) -> Response {
    let result = if state.secret_matches(body.secret.as_deref()) {
        execute(&state, body.symbol.as_deref(), &body.side, None).await
    } else {
        Err(WebhookError::BadSecret)
    };
    respond("/tv/webhook", result)
}

async fn manual_trade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ManualTradeBody>,
) -> Response {
    let result = if state.header_secret_matches(&headers) {
        execute(&state, body.symbol.as_deref(), &body.side, body.qty).await
    } else {
        Err(WebhookError::BadSecret)
    };
    respond("/trade/manual", result)
}

async fn execute(
    state: &AppState,
    symbol: Option<&str>,
    side: &str,
    qty: Option<Decimal>,
) -> WebhookResult<ExecutedResponse> {
    let request = state.dispatcher.parse_request(symbol, side, qty)?;
    let result = state.dispatcher.dispatch(request).await?;
    Ok(ExecutedResponse::new(result))
}

async fn get_exits(State(state): State<AppState>) -> Json<ExitPolicy> {
    Json(state.dispatcher.engine().exit_policy())
}

async fn put_exits(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(policy): Json<ExitPolicy>,
) -> Response {
    let result = if !state.header_secret_matches(&headers) {
        Err(WebhookError::BadSecret)
    } else {
        validate_exit_policy(&policy).map(|()| {
            state.dispatcher.engine().set_exit_policy(policy.clone());
            policy
        })
    };
    respond("/exits", result)
}

fn validate_exit_policy(policy: &ExitPolicy) -> WebhookResult<()> {
    for (name, pct) in [
        ("take_profit_pct", policy.take_profit_pct),
        ("stop_loss_pct", policy.stop_loss_pct),
    ] {
        if pct < Decimal::ZERO || pct >= Decimal::ONE {
            return Err(WebhookError::InvalidExitPolicy(format!(
                "{name} must be in [0, 1), got {pct}"
            )));
        }
    }
    Ok(())
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = state.dispatcher.engine();
    let symbols = engine.specs().symbols();
    let busy = symbols
        .iter()
        .filter(|s| engine.locks().is_locked(s))
        .cloned()
        .collect();
    Json(StatusResponse {
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        arbiter: state.dispatcher.arbiter().snapshot(),
        exit_policy: engine.exit_policy(),
        symbols,
        busy,
    })
}

async fn metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => WebhookError::from(e).into_response(),
    }
}

/// Run the ingestion server until `shutdown` resolves.
pub async fn run_server(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> WebhookResult<()> {
    let addr = state.config.bind_addr();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Starting webhook server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Webhook server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exit_policy_bounds() {
        assert!(validate_exit_policy(&ExitPolicy::default()).is_ok());
        assert!(validate_exit_policy(&ExitPolicy::disabled()).is_ok());

        let negative = ExitPolicy {
            stop_loss_pct: dec!(-0.01),
            ..ExitPolicy::default()
        };
        assert!(matches!(
            validate_exit_policy(&negative),
            Err(WebhookError::InvalidExitPolicy(_))
        ));

        let whole = ExitPolicy {
            take_profit_pct: dec!(1),
            ..ExitPolicy::default()
        };
        assert!(validate_exit_policy(&whole).is_err());
    }
}
