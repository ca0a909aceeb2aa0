//! Signal execution engine.
//!
//! # Stages (per signal, under the symbol lock)
//!
//! 1. Cancel stale protective orders (best-effort)
//! 2. Unwind any opposite position to flat (fatal on exhaustion)
//! 3. Open the requested position (maker first, or market if noisy)
//! 4. Place take-profit / stop-loss trigger orders (best-effort per leg)
//!
//! Exchange calls inside one execution are strictly sequential. Position
//! snapshots are the only fill oracle.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use postonly_core::{
    ExecutionResult, ExitReport, SignalClass, SignalRequest, Size, Symbol, SymbolSpec, UnwindReport,
};
use postonly_exchange::{DynExchange, SpecCache};
use postonly_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::{ExecutorConfig, ExitPolicy};
use crate::entry::{requested_quantity, Opener};
use crate::error::{ExecutorError, ExecutorResult};
use crate::exits::place_exit_orders;
use crate::locks::SymbolLocks;
use crate::session::SymbolSession;
use crate::unwind::close_opposite_if_any;

pub struct ExecutionEngine {
    exchange: DynExchange,
    specs: Arc<SpecCache>,
    config: ExecutorConfig,
    exit_policy: RwLock<ExitPolicy>,
    locks: SymbolLocks,
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(
        exchange: DynExchange,
        specs: Arc<SpecCache>,
        config: ExecutorConfig,
        exit_policy: ExitPolicy,
    ) -> Self {
        Self {
            exchange,
            specs,
            config,
            exit_policy: RwLock::new(exit_policy),
            locks: SymbolLocks::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn exit_policy(&self) -> ExitPolicy {
        self.exit_policy.read().clone()
    }

    /// Replace the exit policy. Applies to executions that reach the exit
    /// stage after this call.
    pub fn set_exit_policy(&self, policy: ExitPolicy) {
        info!(?policy, "Exit policy updated");
        *self.exit_policy.write() = policy;
    }

    pub fn locks(&self) -> &SymbolLocks {
        &self.locks
    }

    pub fn specs(&self) -> &SpecCache {
        &self.specs
    }

    fn spec(&self, symbol: &Symbol) -> ExecutorResult<SymbolSpec> {
        self.specs
            .get(symbol)
            .ok_or_else(|| ExecutorError::UnknownSymbol(symbol.to_string()))
    }

    /// Execute one directional signal.
    ///
    /// Waits for any execution already running on the same symbol.
    pub async fn execute_signal(
        &self,
        request: &SignalRequest,
        class: SignalClass,
    ) -> ExecutorResult<ExecutionResult> {
        let symbol = &request.symbol;
        let spec = self.spec(symbol)?;
        let requested = requested_quantity(request.quantity, self.config.default_quantity)
            .ok_or_else(|| ExecutorError::InvalidQuantity {
                symbol: symbol.clone(),
                quantity: request.quantity.map_or(Decimal::ZERO, |q| q.inner()),
            })?;

        let _guard = self.locks.acquire(symbol).await;
        Metrics::signal_received(symbol.as_str(), request.side.as_str(), class.as_str());
        info!(
            %symbol,
            side = %request.side,
            %class,
            quantity = %requested,
            "Executing signal"
        );

        let started = Instant::now();
        let result = self.run(request, class, &spec, requested).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(r) => {
                let outcome = if r.filled { "filled" } else { "unfilled" };
                Metrics::execution_finished(symbol.as_str(), r.mode.as_str(), outcome, elapsed_ms);
                info!(
                    %symbol,
                    side = %request.side,
                    mode = %r.mode,
                    filled = r.filled,
                    attempts = r.attempts,
                    entry_price = ?r.entry_price.map(|p| p.to_string()),
                    take_profit = r.exits.take_profit.label(),
                    stop_loss = r.exits.stop_loss.label(),
                    elapsed_ms,
                    "Signal executed"
                );
            }
            Err(e) => {
                Metrics::execution_finished(symbol.as_str(), "none", "error", elapsed_ms);
                warn!(%symbol, side = %request.side, error = %e, elapsed_ms, "Signal execution failed");
            }
        }
        result
    }

    /// Place protective orders for the position currently held on `symbol`.
    ///
    /// Does not cancel existing triggers: calling this twice leaves two
    /// independent pairs on the exchange.
    pub async fn place_exits(&self, symbol: &Symbol) -> ExecutorResult<ExitReport> {
        let spec = self.spec(symbol)?;
        let _guard = self.locks.acquire(symbol).await;
        let session = SymbolSession {
            exchange: &*self.exchange,
            config: &self.config,
            symbol,
            spec: &spec,
        };

        let position = match session.position().await {
            Ok(p) => p,
            Err(e) => {
                warn!(%symbol, error = %e, "Position read for exits failed");
                return Ok(ExitReport::skipped(format!("position unavailable: {e}")));
            }
        };
        let Some(side) = position.side().filter(|_| !spec.is_flat(position.amount)) else {
            return Ok(ExitReport::skipped("no position to protect"));
        };
        let policy = self.exit_policy();
        Ok(place_exit_orders(&session, side, position.entry_price, &policy).await)
    }

    async fn run(
        &self,
        request: &SignalRequest,
        class: SignalClass,
        spec: &SymbolSpec,
        requested: Size,
    ) -> ExecutorResult<ExecutionResult> {
        let symbol = &request.symbol;
        let side = request.side.order_side();
        let session = SymbolSession {
            exchange: &*self.exchange,
            config: &self.config,
            symbol,
            spec,
        };

        if let Err(e) = self.exchange.cancel_all_orders(symbol).await {
            warn!(%symbol, error = %e, "Cancel-all before execution failed, continuing");
        }

        let unwind: UnwindReport = close_opposite_if_any(&session, side).await?;

        let opener = Opener::new(&session, request.side, requested).await;
        let entry = opener.run(class).await?;

        let held = entry.held(side);
        let exits = if spec.is_flat(held.inner()) {
            ExitReport::skipped("no position to protect")
        } else {
            let policy = self.exit_policy();
            place_exit_orders(&session, side, entry.entry_price(), &policy).await
        };

        Ok(ExecutionResult {
            symbol: symbol.clone(),
            side: request.side,
            class,
            mode: entry.mode,
            filled: entry.filled,
            attempts: entry.attempts,
            target_quantity: entry.target,
            position_amount: entry.position.as_ref().map_or(Decimal::ZERO, |p| p.amount),
            entry_price: entry.entry_price(),
            unwind,
            exits,
        })
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.config)
            .field("exit_policy", &*self.exit_policy.read())
            .field("symbols", &self.specs.len())
            .finish()
    }
}
