//! Main application orchestration.
//!
//! Wires the exchange binding, spec cache, arbiter, execution engine and
//! ingestion server together:
//! - Preflight: load symbol specs, configure the account (best-effort)
//! - Run: serve signals until Ctrl-C

use crate::config::{credentials_from_env, AppConfig};
use crate::error::{AppError, AppResult};
use crate::report::build_report;
use axum::Router;
use chrono::{DateTime, Utc};
use postonly_arbiter::SignalArbiter;
use postonly_core::{Price, Symbol};
use postonly_exchange::{BinanceFutures, DynExchange, SimExchange, SpecCache};
use postonly_executor::ExecutionEngine;
use postonly_webhook::{create_router, run_server, AppState, SignalDispatcher};
use std::sync::Arc;
use tracing::{info, warn};

/// Where orders go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Binance USD-M futures.
    Live,
    /// In-process simulated exchange.
    Paper,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    mode: ExchangeMode,
    exchange: DynExchange,
    /// Kept separately for account setup calls outside the trait.
    binance: Option<Arc<BinanceFutures>>,
    specs: Arc<SpecCache>,
    symbols: Vec<Symbol>,
}

impl Application {
    /// Create an application for `mode`. Live mode reads API credentials
    /// from the environment.
    pub fn new(config: AppConfig, mode: ExchangeMode) -> AppResult<Self> {
        let symbols = config.symbols()?;
        let mut binance = None;
        let exchange: DynExchange = match mode {
            ExchangeMode::Live => {
                let credentials = credentials_from_env(|key| std::env::var(key).ok())?;
                let client = Arc::new(BinanceFutures::new(&config.binance, credentials)?);
                binance = Some(client.clone());
                client
            }
            ExchangeMode::Paper => Arc::new(paper_exchange(&config, &symbols)),
        };

        Ok(Self {
            config,
            mode,
            exchange,
            binance,
            specs: Arc::new(SpecCache::new()),
            symbols,
        })
    }

    /// Build around an existing exchange (tests, embedding).
    pub fn with_exchange(config: AppConfig, exchange: DynExchange) -> AppResult<Self> {
        let symbols = config.symbols()?;
        Ok(Self {
            config,
            mode: ExchangeMode::Paper,
            exchange,
            binance: None,
            specs: Arc::new(SpecCache::new()),
            symbols,
        })
    }

    pub fn mode(&self) -> ExchangeMode {
        self.mode
    }

    pub fn specs(&self) -> &SpecCache {
        &self.specs
    }

    /// Load symbol specs and prepare the account.
    ///
    /// Spec loading is fatal: the engine cannot quantize without it.
    /// Margin, leverage and position-mode changes are best-effort.
    pub async fn run_preflight(&mut self) -> AppResult<()> {
        info!(symbols = ?self.symbols, mode = ?self.mode, "Running preflight");

        let loaded = self
            .specs
            .load(&*self.exchange, &self.symbols)
            .await
            .map_err(|e| AppError::Preflight(format!("Failed to load symbol specs: {e}")))?;
        info!(loaded, "Spec cache ready");

        if let Some(binance) = &self.binance {
            self.configure_account(binance).await;
        }
        Ok(())
    }

    async fn configure_account(&self, binance: &BinanceFutures) {
        if let Err(e) = binance.set_position_mode(false).await {
            warn!(error = %e, "Failed to select one-way position mode, continuing");
        }
        for symbol in &self.symbols {
            if self.config.bot.isolated_margin {
                if let Err(e) = binance.set_isolated_margin(symbol).await {
                    warn!(%symbol, error = %e, "Failed to set isolated margin, continuing");
                }
            }
            if let Err(e) = binance.set_leverage(symbol, self.config.bot.leverage).await {
                warn!(%symbol, leverage = self.config.bot.leverage, error = %e, "Failed to set leverage, continuing");
            }
        }
    }

    /// Assemble arbiter, engine and dispatcher into server state.
    pub fn build_state(&self) -> AppState {
        let arbiter = Arc::new(SignalArbiter::new(self.config.arbiter.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            self.exchange.clone(),
            self.specs.clone(),
            self.config.executor.clone(),
            self.config.exits.clone(),
        ));
        let dispatcher = Arc::new(SignalDispatcher::new(
            arbiter,
            engine,
            self.config.webhook.default_symbol.clone(),
        ));
        AppState::new(dispatcher, self.config.webhook.clone())
    }

    pub fn router(&self) -> Router {
        create_router(self.build_state())
    }

    /// Serve signals until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        if self.specs.is_empty() {
            return Err(AppError::Preflight(
                "Symbol specs not loaded. Call run_preflight() first.".to_string(),
            ));
        }
        info!(
            mode = ?self.mode,
            addr = %self.config.webhook.bind_addr(),
            auth = self.config.webhook.auth_enabled(),
            arbiter = self.config.arbiter.enabled,
            "Starting application"
        );
        run_server(self.build_state(), shutdown_signal()).await?;
        info!("Shutting down");
        Ok(())
    }

    /// Render the round-trip report for `symbol`.
    pub async fn report(
        &self,
        symbol: &Symbol,
        since: Option<DateTime<Utc>>,
        json: bool,
    ) -> AppResult<String> {
        build_report(&*self.exchange, symbol, since, json).await
    }
}

fn paper_exchange(config: &AppConfig, symbols: &[Symbol]) -> SimExchange {
    let sim = SimExchange::new();
    for symbol in symbols {
        let market = config.paper.market(symbol);
        info!(%symbol, bid = %market.bid, ask = %market.ask, "Paper market");
        sim.add_symbol(
            symbol.clone(),
            market.spec(),
            Price::new(market.bid),
            Price::new(market.ask),
        );
    }
    sim
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
