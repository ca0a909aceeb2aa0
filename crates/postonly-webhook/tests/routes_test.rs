//! Route tests against the simulated exchange.
//!
//! Tests that:
//! - A TradingView long is executed and answered with the execution result
//! - The shared secret and side are validated before anything executes
//! - Manual trades need the secret header when a secret is configured
//! - Unknown symbols are rejected with 400
//! - Engine failures surface as 500 with the retriable flag
//! - The exit policy can be read and replaced at runtime

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use postonly_arbiter::{ArbiterConfig, SignalArbiter};
use postonly_core::{OrderKind, Price, Size, Symbol, SymbolSpec};
use postonly_exchange::{SimExchange, SpecCache};
use postonly_executor::{ExecutionEngine, ExecutorConfig, ExitPolicy};
use postonly_webhook::{create_router, AppState, SignalDispatcher, WebhookConfig, SECRET_HEADER};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn eth() -> Symbol {
    Symbol::new("ETHUSDT").unwrap()
}

fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        order_timeout_ms: 1,
        open_attempt_timeout_ms: 50,
        close_timeout_ms: 50,
        max_retries: 3,
        poll_interval_ms: 1,
        entry_settle_timeout_ms: 50,
        ..ExecutorConfig::default()
    }
}

fn setup(secret: &str) -> (Router, Arc<SimExchange>, Arc<SignalDispatcher>) {
    let sim = Arc::new(SimExchange::new());
    let specs = Arc::new(SpecCache::new());
    let spec = SymbolSpec::new(Price::new(dec!(0.01)), Size::new(dec!(0.001)), dec!(5));
    sim.add_symbol(eth(), spec.clone(), Price::new(dec!(100.00)), Price::new(dec!(100.01)));
    specs.insert(eth(), spec).unwrap();

    let engine = Arc::new(ExecutionEngine::new(
        sim.clone(),
        specs,
        fast_config(),
        ExitPolicy::default(),
    ));
    let arbiter = Arc::new(SignalArbiter::new(ArbiterConfig::default()));
    let dispatcher = Arc::new(SignalDispatcher::new(arbiter, engine, "ETHUSDT"));
    let config = WebhookConfig {
        secret: secret.to_string(),
        ..WebhookConfig::default()
    };
    let router = create_router(AppState::new(dispatcher.clone(), config));
    (router, sim, dispatcher)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let (app, _, _) = setup("");
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn test_tv_long_executes_as_maker() {
    let (app, sim, dispatcher) = setup("s3cret");

    let response = app
        .oneshot(post_json(
            "/tv/webhook",
            json!({"symbol": "ethusdt", "side": "LONG", "secret": "s3cret"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["symbol"], "ETHUSDT");
    assert_eq!(body["action"], "long");
    assert_eq!(body["result"]["mode"], "maker");
    assert_eq!(body["result"]["filled"], true);

    assert_eq!(sim.placed_of_kind(OrderKind::MakerOpen).len(), 1);
    assert_eq!(sim.position_amount(&eth()), dec!(0.05));
    // successful open feeds the arbiter's hold check
    assert!(dispatcher.arbiter().snapshot().last_open_ms.is_some());
}

#[tokio::test]
async fn test_tv_bad_secret_is_forbidden() {
    let (app, sim, dispatcher) = setup("s3cret");

    let response = app
        .oneshot(post_json(
            "/tv/webhook",
            json!({"side": "long", "secret": "guess"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["detail"], "bad secret");
    assert!(sim.placed_orders().is_empty());
    assert_eq!(dispatcher.arbiter().snapshot().window_signals, 0);
}

#[tokio::test]
async fn test_tv_without_configured_secret_accepts_any() {
    let (app, _, _) = setup("");
    let response = app
        .oneshot(post_json("/tv/webhook", json!({"side": "short"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["action"], "short");
}

#[tokio::test]
async fn test_invalid_side_is_unprocessable() {
    let (app, sim, _) = setup("");
    let response = app
        .oneshot(post_json("/tv/webhook", json!({"side": "sideways"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(sim.placed_orders().is_empty());
}

#[tokio::test]
async fn test_unknown_symbol_is_bad_request() {
    let (app, _, _) = setup("");
    let response = app
        .oneshot(post_json(
            "/trade/manual",
            json!({"symbol": "DOGEUSDT", "side": "long"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["retriable"], false);
}

#[tokio::test]
async fn test_manual_trade_uses_qty() {
    let (app, sim, _) = setup("s3cret");
    let mut request = post_json("/trade/manual", json!({"side": "short", "qty": "0.5"}));
    request
        .headers_mut()
        .insert(SECRET_HEADER, "s3cret".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sim.position_amount(&eth()), dec!(-0.5));
}

#[tokio::test]
async fn test_manual_trade_requires_secret_header() {
    let (app, sim, dispatcher) = setup("s3cret");

    let response = app
        .clone()
        .oneshot(post_json("/trade/manual", json!({"side": "long", "qty": "0.5"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut wrong = post_json("/trade/manual", json!({"side": "long", "qty": "0.5"}));
    wrong
        .headers_mut()
        .insert(SECRET_HEADER, "s3cre".parse().unwrap());
    let response = app.oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(sim.placed_orders().is_empty());
    assert_eq!(dispatcher.arbiter().snapshot().window_signals, 0);
}

#[tokio::test]
async fn test_manual_trade_rejects_non_positive_qty() {
    let (app, _, _) = setup("");
    let response = app
        .oneshot(post_json("/trade/manual", json!({"side": "long", "qty": "-1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_open_failure_is_retriable_server_error() {
    let (app, sim, _) = setup("");
    sim.set_maker_fill_cap(Some(dec!(0)));
    sim.reject_market_orders(true);

    let response = app
        .oneshot(post_json("/trade/manual", json!({"side": "long", "qty": "1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["retriable"], true);
}

#[tokio::test]
async fn test_exit_policy_roundtrip() {
    let (app, _, dispatcher) = setup("s3cret");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/exits").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["take_profit_pct"], "0.01");

    let update = json!({
        "take_profit_pct": "0.02",
        "stop_loss_pct": "0.01",
        "take_profit_enabled": true,
        "stop_loss_enabled": false
    });

    let unauthorized = Request::builder()
        .method("PUT")
        .uri("/exits")
        .header("content-type", "application/json")
        .body(Body::from(update.to_string()))
        .unwrap();
    let response = app.clone().oneshot(unauthorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let authorized = Request::builder()
        .method("PUT")
        .uri("/exits")
        .header("content-type", "application/json")
        .header(SECRET_HEADER, "s3cret")
        .body(Body::from(update.to_string()))
        .unwrap();
    let response = app.oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let policy = dispatcher.engine().exit_policy();
    assert_eq!(policy.take_profit_pct, dec!(0.02));
    assert!(!policy.stop_loss_enabled);
}

#[tokio::test]
async fn test_status_reports_arbiter() {
    let (app, _, _) = setup("");
    let _ = app
        .clone()
        .oneshot(post_json("/tv/webhook", json!({"side": "long"})))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["arbiter"]["window_signals"], 1);
    assert_eq!(body["arbiter"]["last_side"], "long");
    assert_eq!(body["symbols"], json!(["ETHUSDT"]));
    assert_eq!(body["busy"], json!([]));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (app, _, _) = setup("");
    let _ = app
        .clone()
        .oneshot(post_json("/tv/webhook", json!({"side": "long"})))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("postonly_http_requests_total"));
    assert!(text.contains("postonly_signals_total"));
}
