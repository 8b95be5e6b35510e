//! Lazily initialized strategy handles

use crate::strategy::{Preloaded, Strategy, StrategyLoader};
use futures::FutureExt;
use logcascade_core::Availability;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Process-lifetime holder for one strategy.
///
/// The loader runs on first resolution only. Its outcome, success or
/// failure, is cached: a strategy that failed to initialize is never
/// retried.
pub struct StrategySlot {
    name: String,
    loader: Arc<dyn StrategyLoader>,
    state: OnceCell<Result<Arc<dyn Strategy>, String>>,
}

impl StrategySlot {
    /// Create a slot that initializes through `loader`
    pub fn new(loader: Arc<dyn StrategyLoader>) -> Self {
        Self {
            name: loader.name().to_string(),
            loader,
            state: OnceCell::new(),
        }
    }

    /// Create a slot around an already constructed strategy
    pub fn ready(strategy: Arc<dyn Strategy>) -> Self {
        Self::new(Arc::new(Preloaded::new(strategy)))
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initialize on first call and return the strategy if it is available
    pub async fn resolve(&self) -> Option<Arc<dyn Strategy>> {
        let state = self
            .state
            .get_or_init(|| async {
                info!("Initializing strategy: {}", self.name);

                match AssertUnwindSafe(self.loader.load()).catch_unwind().await {
                    Ok(Ok(strategy)) => {
                        info!("✓ Strategy available: {}", self.name);
                        Ok(strategy)
                    }
                    Ok(Err(e)) => {
                        warn!("✗ Strategy {} unavailable: {}", self.name, e);
                        Err(e.to_string())
                    }
                    Err(_) => {
                        warn!("✗ Strategy {} panicked during initialization", self.name);
                        Err("initialization panicked".to_string())
                    }
                }
            })
            .await;

        state.as_ref().ok().cloned()
    }

    /// Current availability without triggering initialization
    pub fn availability(&self) -> Availability {
        match self.state.get() {
            None => Availability::Pending,
            Some(Ok(_)) => Availability::Available,
            Some(Err(reason)) => Availability::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use logcascade_core::{Error, Result, Verdict};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Fixed;

    #[async_trait]
    impl Strategy for Fixed {
        async fn classify(&self, _message: &str) -> Result<Verdict> {
            Ok(Verdict::label("Fixed"))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct CountingLoader {
        attempts: AtomicU32,
        fail: bool,
        delay: Option<Duration>,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                attempts: AtomicU32::new(0),
                fail,
                delay: None,
            }
        }

        fn slow(fail: bool) -> Self {
            Self {
                delay: Some(Duration::from_millis(50)),
                ..Self::new(fail)
            }
        }
    }

    #[async_trait]
    impl StrategyLoader for CountingLoader {
        fn name(&self) -> &str {
            "counting"
        }

        async fn load(&self) -> Result<Arc<dyn Strategy>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(Error::model("weights not found"))
            } else {
                Ok(Arc::new(Fixed))
            }
        }
    }

    struct PanickingLoader;

    #[async_trait]
    impl StrategyLoader for PanickingLoader {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn load(&self) -> Result<Arc<dyn Strategy>> {
            panic!("runtime mismatch");
        }
    }

    #[tokio::test]
    async fn test_ready_slot() {
        let slot = StrategySlot::ready(Arc::new(Fixed));
        assert_eq!(slot.name(), "fixed");
        assert_eq!(slot.availability(), Availability::Pending);

        assert!(slot.resolve().await.is_some());
        assert_eq!(slot.availability(), Availability::Available);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_cached() {
        let loader = Arc::new(CountingLoader::new(true));
        let slot = StrategySlot::new(loader.clone());

        assert!(slot.resolve().await.is_none());
        assert!(slot.resolve().await.is_none());
        assert!(slot.resolve().await.is_none());

        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            slot.availability(),
            Availability::Unavailable {
                reason: "model error: weights not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_successful_initialization_runs_once() {
        let loader = Arc::new(CountingLoader::new(false));
        let slot = StrategySlot::new(loader.clone());

        for _ in 0..5 {
            assert!(slot.resolve().await.is_some());
        }
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_loader_marks_unavailable() {
        let slot = StrategySlot::new(Arc::new(PanickingLoader));

        assert!(slot.resolve().await.is_none());
        assert!(!slot.availability().is_available());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_attempt() {
        for fail in [false, true] {
            let loader = Arc::new(CountingLoader::slow(fail));
            let slot = Arc::new(StrategySlot::new(loader.clone()));

            let callers = (0..16).map(|_| {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move { slot.resolve().await.is_some() })
            });
            let results = futures::future::join_all(callers).await;

            for resolved in results {
                assert_eq!(resolved.unwrap(), !fail);
            }
            assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
        }
    }
}
