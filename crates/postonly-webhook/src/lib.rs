//! postonly-webhook - HTTP signal ingestion.
//!
//! Accepts TradingView alerts and manual trade requests, classifies them
//! with the process-wide [`SignalArbiter`](postonly_arbiter::SignalArbiter)
//! and hands them to the execution engine. Each request awaits its own
//! execution and returns the result.
//!
//! # Routes
//!
//! ```text
//! GET  /healthz        liveness
//! POST /tv/webhook     {symbol?, side, secret?}
//! POST /trade/manual   {symbol?, side, qty?} (x-webhook-secret when configured)
//! GET  /exits          current exit policy
//! PUT  /exits          replace exit policy (x-webhook-secret when configured)
//! GET  /status         arbiter snapshot, busy symbols
//! GET  /metrics        Prometheus text exposition
//! ```

mod config;
mod dispatch;
mod error;
mod server;
mod types;

pub use config::WebhookConfig;
pub use dispatch::SignalDispatcher;
pub use error::{WebhookError, WebhookResult};
pub use server::{create_router, run_server, AppState, SECRET_HEADER};
pub use types::{
    ErrorResponse, ExecutedResponse, HealthResponse, ManualTradeBody, StatusResponse,
    TvWebhookBody,
};
