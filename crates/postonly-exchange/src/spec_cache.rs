//! Symbol specification cache.
//!
//! Trading increments are fetched once at startup and never change for the
//! lifetime of the process. A second, different spec for an already loaded
//! symbol is refused rather than silently swapped in.

use dashmap::DashMap;
use postonly_core::{Symbol, SymbolSpec};
use tracing::{error, info};

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::Exchange;

/// Symbol specification cache.
#[derive(Debug, Default)]
pub struct SpecCache {
    specs: DashMap<Symbol, SymbolSpec>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get spec for a symbol.
    pub fn get(&self, symbol: &Symbol) -> Option<SymbolSpec> {
        self.specs.get(symbol).map(|entry| entry.clone())
    }

    /// Get spec for a symbol or fail with `UnknownSymbol`.
    pub fn require(&self, symbol: &Symbol) -> ExchangeResult<SymbolSpec> {
        self.get(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.specs.contains_key(symbol)
    }

    /// Store a spec. Re-inserting an identical spec is a no-op; a different
    /// one is rejected.
    pub fn insert(&self, symbol: Symbol, spec: SymbolSpec) -> ExchangeResult<()> {
        if let Some(existing) = self.specs.get(&symbol) {
            if *existing == spec {
                return Ok(());
            }
            error!(
                %symbol,
                old_tick = %existing.tick_size,
                new_tick = %spec.tick_size,
                old_step = %existing.step_size,
                new_step = %spec.step_size,
                "Refusing to replace loaded symbol spec"
            );
            return Err(ExchangeError::SpecAlreadyLoaded(symbol.to_string()));
        }
        self.specs.insert(symbol, spec);
        Ok(())
    }

    /// Fetch and store specs for every symbol. Stops at the first failure.
    pub async fn load(&self, exchange: &dyn Exchange, symbols: &[Symbol]) -> ExchangeResult<usize> {
        for symbol in symbols {
            let spec = exchange.symbol_spec(symbol).await?;
            info!(
                %symbol,
                tick_size = %spec.tick_size,
                step_size = %spec.step_size,
                min_notional = %spec.min_notional,
                "Loaded symbol spec"
            );
            self.insert(symbol.clone(), spec)?;
        }
        Ok(self.specs.len())
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.specs.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
