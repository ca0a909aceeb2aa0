//! Per-symbol execution locks.
//!
//! The map only guards lazy creation of a symbol's mutex. The mutex itself
//! is held for the whole execution, across awaits.

use std::sync::Arc;

use dashmap::DashMap;
use postonly_core::Symbol;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SymbolLocks {
    locks: DashMap<Symbol, Arc<Mutex<()>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, symbol: &Symbol) -> Arc<Mutex<()>> {
        // Clone out of the shard guard before awaiting anything.
        self.locks
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait for exclusive access to `symbol`.
    pub async fn acquire(&self, symbol: &Symbol) -> OwnedMutexGuard<()> {
        self.slot(symbol).lock_owned().await
    }

    pub fn is_locked(&self, symbol: &Symbol) -> bool {
        self.locks
            .get(symbol)
            .map_or(false, |m| m.value().try_lock().is_err())
    }
}
