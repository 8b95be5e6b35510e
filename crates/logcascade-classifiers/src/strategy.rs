//! Strategy trait and loading extension points

use async_trait::async_trait;
use logcascade_core::{Result, Verdict};
use std::sync::Arc;

/// A single classification strategy in the cascade
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Classify one log message
    async fn classify(&self, message: &str) -> Result<Verdict>;

    /// Get the strategy name
    fn name(&self) -> &str;
}

/// Deferred construction of a strategy.
///
/// Loading may touch the filesystem, download model weights or read
/// credentials, so the cascade runs it lazily and at most once per slot.
#[async_trait]
pub trait StrategyLoader: Send + Sync {
    /// Name of the strategy this loader produces
    fn name(&self) -> &str;

    /// Initialize the strategy's dependencies
    async fn load(&self) -> Result<Arc<dyn Strategy>>;
}

/// Loader for a strategy that is already constructed
pub struct Preloaded {
    strategy: Arc<dyn Strategy>,
}

impl Preloaded {
    /// Wrap an existing strategy
    pub fn new(strategy: Arc<dyn Strategy>) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl StrategyLoader for Preloaded {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    async fn load(&self) -> Result<Arc<dyn Strategy>> {
        Ok(Arc::clone(&self.strategy))
    }
}
