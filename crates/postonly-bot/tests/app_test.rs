//! Application wiring tests on the paper exchange.
//!
//! Tests that:
//! - Preflight loads specs for every configured symbol
//! - The assembled router executes a signal end to end
//! - The report subcommand renders round trips from the simulated history

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use postonly_bot::config::PaperMarket;
use postonly_bot::{AppConfig, Application, ExchangeMode};
use postonly_core::{Price, Size, Symbol, SymbolSpec};
use postonly_exchange::SimExchange;
use rust_decimal_macros::dec;
use tower::ServiceExt;

fn paper_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.bot.symbols = vec!["ETHUSDT".to_string(), "BTCUSDT".to_string()];
    config.paper.markets = vec![PaperMarket {
        bid: dec!(100.00),
        ask: dec!(100.01),
        ..PaperMarket::with_defaults("ETHUSDT")
    }];
    config.executor.open_attempt_timeout_ms = 50;
    config.executor.close_timeout_ms = 50;
    config.executor.poll_interval_ms = 1;
    config.executor.order_timeout_ms = 1;
    config.executor.entry_settle_timeout_ms = 50;
    config
}

#[tokio::test]
async fn test_paper_preflight_loads_specs() {
    let mut app = Application::new(paper_config(), ExchangeMode::Paper).unwrap();
    app.run_preflight().await.unwrap();

    assert_eq!(app.mode(), ExchangeMode::Paper);
    assert_eq!(app.specs().len(), 2);
    let eth = app.specs().get(&Symbol::new("ETHUSDT").unwrap()).unwrap();
    assert_eq!(eth.step_size, Size::new(dec!(0.001)));
}

#[tokio::test]
async fn test_preflight_fails_for_unlisted_symbol() {
    let sim = Arc::new(SimExchange::new());
    let mut app = Application::with_exchange(AppConfig::default(), sim).unwrap();
    assert!(app.run_preflight().await.is_err());
}

#[tokio::test]
async fn test_paper_router_executes_signal() {
    let mut app = Application::new(paper_config(), ExchangeMode::Paper).unwrap();
    app.run_preflight().await.unwrap();
    let router = app.router();

    let request = Request::builder()
        .method("POST")
        .uri("/tv/webhook")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"side":"long"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["symbol"], "ETHUSDT");
    assert_eq!(body["result"]["filled"], true);
}

#[tokio::test]
async fn test_report_renders_round_trip() {
    let sim = Arc::new(SimExchange::new());
    let eth = Symbol::new("ETHUSDT").unwrap();
    let spec = SymbolSpec::new(Price::new(dec!(0.01)), Size::new(dec!(0.001)), dec!(5));
    sim.add_symbol(eth.clone(), spec, Price::new(dec!(100.00)), Price::new(dec!(100.01)));

    let mut app = Application::with_exchange(paper_config_single(), sim.clone()).unwrap();
    app.run_preflight().await.unwrap();

    let engine_router = app.router();
    for side in ["long", "short"] {
        let request = Request::builder()
            .method("POST")
            .uri("/trade/manual")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"side":"{side}","qty":"1"}}"#)))
            .unwrap();
        let response = engine_router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // long closed by the flip, short still open
    let text = app.report(&eth, None, false).await.unwrap();
    assert!(text.starts_with("ETHUSDT: 1 round trips"));
    assert!(text.contains("long"));

    let json = app.report(&eth, None, true).await.unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["summary"]["round_trips"], 1);
    assert_eq!(doc["round_trips"][0]["direction"], "long");
}

fn paper_config_single() -> AppConfig {
    let mut config = paper_config();
    config.bot.symbols = vec!["ETHUSDT".to_string()];
    config.arbiter.enabled = false;
    config
}
