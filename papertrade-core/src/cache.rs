//! The process-wide price cache.
//!
//! Last-value-wins per symbol, no history, never persisted: the cache is
//! derived state, rebuilt from the feed after a restart. Absence of a
//! symbol is a normal condition that every consumer must handle: admission
//! fails with a retriable error and the liquidation scan skips the position.

use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrent map of symbol to the latest reference price.
///
/// Shared via `Arc` and injected into every component that values
/// positions; never accessed as ambient global state.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: RwLock<HashMap<String, f64>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the price for `symbol` unconditionally.
    pub fn set(&self, symbol: &str, price: f64) {
        let mut prices = self.prices.write().unwrap();
        prices.insert(symbol.to_string(), price);
    }

    /// The latest known price, or `None` if the feed has not delivered a
    /// tick for this symbol since startup.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.read().unwrap().get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
