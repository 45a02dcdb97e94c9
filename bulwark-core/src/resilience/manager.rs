//! Named registries of bulkheads and fallback strategies.
//!
//! Managers are plain objects created at start-up and shared by `Arc`. The
//! first configuration registered under a name wins; later lookups with a
//! different configuration get the existing instance back.

use crate::error::Result;
use crate::resilience::bulkhead::{Bulkhead, BulkheadConfig};
use crate::resilience::fallback::FallbackConfig;
use crate::resilience::stats::{BulkheadStats, FallbackStats};
use crate::resilience::strategy::FallbackStrategy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One [`Bulkhead`] per logical consumer.
#[derive(Debug, Default)]
pub struct BulkheadManager {
    bulkheads: RwLock<HashMap<String, Arc<Bulkhead>>>,
}

impl BulkheadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bulkhead registered as `name`, created from `config` if absent.
    pub fn get_bulkhead(&self, name: &str, config: BulkheadConfig) -> Result<Arc<Bulkhead>> {
        if let Some(bulkhead) = self.bulkheads.read().get(name) {
            return Ok(Arc::clone(bulkhead));
        }

        let mut bulkheads = self.bulkheads.write();
        if let Some(bulkhead) = bulkheads.get(name) {
            debug!(name, "Bulkhead already registered, ignoring new config");
            return Ok(Arc::clone(bulkhead));
        }
        let bulkhead = Bulkhead::new(name, config)?;
        bulkheads.insert(name.to_string(), Arc::clone(&bulkhead));
        Ok(bulkhead)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Bulkhead>> {
        self.bulkheads.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bulkheads.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_all_stats(&self) -> HashMap<String, BulkheadStats> {
        self.bulkheads
            .read()
            .iter()
            .map(|(name, bulkhead)| (name.clone(), bulkhead.get_stats()))
            .collect()
    }

    pub fn reset_all_stats(&self) {
        for bulkhead in self.bulkheads.read().values() {
            bulkhead.reset_stats();
        }
    }
}

/// One [`FallbackStrategy`] per named strategy.
#[derive(Debug, Default)]
pub struct FallbackManager {
    strategies: RwLock<HashMap<String, Arc<FallbackStrategy>>>,
}

impl FallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strategy registered as `name`, created from `config` if absent.
    pub fn get_strategy(&self, name: &str, config: FallbackConfig) -> Result<Arc<FallbackStrategy>> {
        if let Some(strategy) = self.strategies.read().get(name) {
            return Ok(Arc::clone(strategy));
        }

        let mut strategies = self.strategies.write();
        if let Some(strategy) = strategies.get(name) {
            debug!(name, "Fallback strategy already registered, ignoring new config");
            return Ok(Arc::clone(strategy));
        }
        let strategy = FallbackStrategy::new(name, config)?;
        strategies.insert(name.to_string(), Arc::clone(&strategy));
        Ok(strategy)
    }

    pub fn get(&self, name: &str) -> Option<Arc<FallbackStrategy>> {
        self.strategies.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_all_stats(&self) -> HashMap<String, FallbackStats> {
        self.strategies
            .read()
            .iter()
            .map(|(name, strategy)| (name.clone(), strategy.get_stats()))
            .collect()
    }

    pub fn reset_all_stats(&self) {
        for strategy in self.strategies.read().values() {
            strategy.reset_stats();
        }
    }
}
