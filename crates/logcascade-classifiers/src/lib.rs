//! logcascade Classifiers
//!
//! Classification strategies for application log messages and the cascade
//! that sequences them.
//!
//! Strategies are ordered by cost:
//! - Regex (<1ms): fixed rule table for high-volume, well-known messages
//! - Embedding (~10ms on CPU): sentence encoder plus a pretrained classifier head
//! - LLM (network bound): chat completion fallback for everything else
//!
//! Each strategy loads lazily on first use. One that fails to load is
//! reported as unavailable and skipped; the cascade itself never fails.

pub mod cascade;
pub mod classifier_head;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod registry;
pub mod rules;
#[cfg(feature = "ml-models")]
pub mod sentence_encoder;
pub mod slot;
pub mod strategy;

pub use cascade::{Cascade, CascadeBuilder, CascadeDecision, StageOutcome, StageTrace};
pub use classifier_head::{
    ClassifierArtifact, LogisticRegression, NearestCentroid, ProbabilisticClassifier,
};
pub use config::{
    CascadeConfig, EmbeddingSettings, EncoderSettings, EncoderSource, LlmSettings,
    OrchestrationSettings, RegexSettings,
};
pub use embedding::{EmbeddingStrategy, Encoder, DEFAULT_CONFIDENCE_THRESHOLD};
pub use llm::{extract_category, LlmStrategy};
pub use registry::{
    build_cascade_from_config, load_config, load_config_or_default, EmbeddingLoader, LlmLoader,
    RegexLoader,
};
pub use rules::{default_rules, RegexRule, RegexStrategy};
#[cfg(feature = "ml-models")]
pub use sentence_encoder::SentenceEncoder;
pub use slot::StrategySlot;
pub use strategy::{Preloaded, Strategy, StrategyLoader};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cascade::{Cascade, CascadeDecision};
    pub use crate::config::CascadeConfig;
    pub use crate::registry::build_cascade_from_config;
    pub use crate::strategy::{Strategy, StrategyLoader};
    pub use logcascade_core::prelude::*;
}
