//! Classification cascade
//!
//! Strategies run in a fixed order, cheapest first. A record moves on to the
//! next strategy while its outcome is still "no opinion" or `Unclassified`,
//! and the first concrete label wins. Nothing that goes wrong inside a
//! strategy escapes: unavailable strategies are skipped, and an invocation
//! error or timeout only costs that strategy its say on that one record.

use crate::slot::StrategySlot;
use crate::strategy::{Strategy, StrategyLoader};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use logcascade_core::{Availability, Error, Label, LogRecord, Result, Verdict};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Ordered set of strategies with escalation on no answer
pub struct Cascade {
    stages: Vec<Arc<StrategySlot>>,
    max_concurrency: usize,
    strategy_timeout: Option<Duration>,
}

/// What happened at one stage for one record
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Strategy unavailable; not invoked
    Skipped,

    /// Strategy answered
    Answered(Verdict),

    /// Invocation failed or timed out; treated as no opinion
    Failed(String),
}

/// Trace entry for one stage
#[derive(Debug, Clone)]
pub struct StageTrace {
    /// Strategy name
    pub strategy: String,

    /// Stage outcome
    pub outcome: StageOutcome,

    /// Invocation latency (zero when skipped)
    pub latency_us: u64,
}

/// Final decision for one record
#[derive(Debug, Clone)]
pub struct CascadeDecision {
    /// Assigned label, never empty
    pub label: Label,

    /// Strategy whose answer was kept, if any
    pub decided_by: Option<String>,

    /// Stages that were consulted, in order
    pub trace: Vec<StageTrace>,

    /// Total time spent on this record
    pub latency_us: u64,
}

impl Cascade {
    /// Start building a cascade
    pub fn builder() -> CascadeBuilder {
        CascadeBuilder::new()
    }

    /// Classify a batch; one label per record, in input order
    pub async fn classify(&self, records: &[LogRecord]) -> Vec<Label> {
        self.classify_detailed(records)
            .await
            .into_iter()
            .map(|decision| decision.label)
            .collect()
    }

    /// Classify a batch and keep the per-stage trace
    pub async fn classify_detailed(&self, records: &[LogRecord]) -> Vec<CascadeDecision> {
        let resolved = self.resolve().await;
        let resolved = &resolved;

        metrics::counter!("logcascade_records_total").increment(records.len() as u64);

        let pending: Vec<_> = records
            .iter()
            .map(|record| self.decide(resolved, &record.message))
            .collect();

        stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Classify a single message
    pub async fn classify_one(&self, message: &str) -> CascadeDecision {
        let resolved = self.resolve().await;
        metrics::counter!("logcascade_records_total").increment(1);
        self.decide(&resolved, message).await
    }

    /// Initialize every strategy now instead of on first batch
    pub async fn warm_up(&self) {
        self.resolve().await;
    }

    /// Availability of each strategy, in cascade order
    pub fn availability(&self) -> Vec<(String, Availability)> {
        self.stages
            .iter()
            .map(|slot| (slot.name().to_string(), slot.availability()))
            .collect()
    }

    /// Strategy names, in cascade order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|slot| slot.name().to_string()).collect()
    }

    /// Get number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Resolve every slot; each initializes at most once per process
    async fn resolve(&self) -> Vec<(String, Option<Arc<dyn Strategy>>)> {
        let mut resolved = Vec::with_capacity(self.stages.len());
        for slot in &self.stages {
            resolved.push((slot.name().to_string(), slot.resolve().await));
        }
        resolved
    }

    async fn decide(
        &self,
        stages: &[(String, Option<Arc<dyn Strategy>>)],
        message: &str,
    ) -> CascadeDecision {
        let start = Instant::now();
        let mut current = Verdict::NoOpinion;
        let mut decided_by: Option<String> = None;
        let mut trace = Vec::with_capacity(stages.len());

        for (name, strategy) in stages {
            if !current.escalates() {
                break;
            }

            let Some(strategy) = strategy else {
                trace.push(StageTrace {
                    strategy: name.clone(),
                    outcome: StageOutcome::Skipped,
                    latency_us: 0,
                });
                continue;
            };

            let stage_start = Instant::now();
            let result = self.invoke(strategy.as_ref(), message).await;
            let latency_us = stage_start.elapsed().as_micros() as u64;

            metrics::histogram!("logcascade_strategy_latency_us", "strategy" => name.clone())
                .record(latency_us as f64);

            let outcome = match result {
                Ok(verdict) => {
                    debug!("{} -> {}", name, verdict.kind());
                    if verdict != Verdict::NoOpinion {
                        current = verdict.clone();
                        decided_by = Some(name.clone());
                    }
                    StageOutcome::Answered(verdict)
                }
                Err(e) => {
                    warn!("Strategy {} failed on record: {}", name, e);
                    metrics::counter!("logcascade_strategy_errors_total", "strategy" => name.clone())
                        .increment(1);
                    StageOutcome::Failed(e.to_string())
                }
            };

            trace.push(StageTrace {
                strategy: name.clone(),
                outcome,
                latency_us,
            });
        }

        let label = current.into_label();
        metrics::counter!(
            "logcascade_decisions_total",
            "strategy" => decided_by.clone().unwrap_or_else(|| "none".to_string())
        )
        .increment(1);

        CascadeDecision {
            label,
            decided_by,
            trace,
            latency_us: start.elapsed().as_micros() as u64,
        }
    }

    async fn invoke(&self, strategy: &dyn Strategy, message: &str) -> Result<Verdict> {
        let call = AssertUnwindSafe(strategy.classify(message)).catch_unwind();

        let outcome = match self.strategy_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout)?,
            None => call.await,
        };

        outcome.unwrap_or_else(|_| Err(Error::strategy("strategy panicked")))
    }
}

/// Builder for constructing cascades fluently
pub struct CascadeBuilder {
    stages: Vec<Arc<StrategySlot>>,
    max_concurrency: usize,
    strategy_timeout: Option<Duration>,
}

impl CascadeBuilder {
    /// Create a new cascade builder
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            max_concurrency: 1,
            strategy_timeout: None,
        }
    }

    /// Append a constructed strategy
    pub fn strategy(self, strategy: Arc<dyn Strategy>) -> Self {
        self.slot(StrategySlot::ready(strategy))
    }

    /// Append a strategy initialized lazily by `loader`
    pub fn loader(self, loader: Arc<dyn StrategyLoader>) -> Self {
        self.slot(StrategySlot::new(loader))
    }

    /// Append a slot
    pub fn slot(mut self, slot: StrategySlot) -> Self {
        self.stages.push(Arc::new(slot));
        self
    }

    /// Records classified concurrently within a batch (minimum 1)
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Upper bound on a single strategy invocation
    pub fn strategy_timeout(mut self, timeout: Duration) -> Self {
        self.strategy_timeout = Some(timeout);
        self
    }

    /// Build the cascade
    pub fn build(self) -> Cascade {
        Cascade {
            stages: self.stages,
            max_concurrency: self.max_concurrency,
            strategy_timeout: self.strategy_timeout,
        }
    }
}

impl Default for CascadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
