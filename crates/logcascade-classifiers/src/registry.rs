//! Strategy loaders and config-driven cascade construction

use crate::cascade::Cascade;
use crate::classifier_head::ClassifierArtifact;
use crate::config::{CascadeConfig, EmbeddingSettings, LlmSettings, RegexSettings};
use crate::embedding::EmbeddingStrategy;
use crate::llm::LlmStrategy;
use crate::rules::{default_rules, RegexStrategy};
use crate::strategy::{Strategy, StrategyLoader};
use async_trait::async_trait;
use logcascade_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Compiles the regex rule table
pub struct RegexLoader {
    settings: RegexSettings,
}

impl RegexLoader {
    pub fn new(settings: RegexSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StrategyLoader for RegexLoader {
    fn name(&self) -> &str {
        "regex"
    }

    async fn load(&self) -> Result<Arc<dyn Strategy>> {
        let mut rules = if self.settings.include_defaults {
            default_rules()
        } else {
            Vec::new()
        };
        rules.extend(self.settings.rules.iter().cloned());

        let strategy = RegexStrategy::new(rules, self.settings.case_insensitive)?;
        info!("Compiled {} regex rules", strategy.rule_count());
        Ok(Arc::new(strategy))
    }
}

/// Loads the classifier artifact and the sentence encoder
pub struct EmbeddingLoader {
    settings: EmbeddingSettings,
}

impl EmbeddingLoader {
    pub fn new(settings: EmbeddingSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StrategyLoader for EmbeddingLoader {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn load(&self) -> Result<Arc<dyn Strategy>> {
        let settings = self.settings.clone();

        // Model loading is blocking file and network IO plus weight mapping
        let strategy = tokio::task::spawn_blocking(move || load_embedding_strategy(&settings))
            .await
            .map_err(|e| Error::internal(format!("Embedding loader task failed: {}", e)))??;

        Ok(Arc::new(strategy))
    }
}

#[cfg(feature = "ml-models")]
fn load_embedding_strategy(settings: &EmbeddingSettings) -> Result<EmbeddingStrategy> {
    use crate::sentence_encoder::SentenceEncoder;

    // The artifact is cheap to check, so a missing one fails before any download
    let classifier = ClassifierArtifact::from_file(&settings.classifier_path)?;
    info!(
        "Loaded classifier artifact {} ({} classes)",
        settings.classifier_path.display(),
        crate::classifier_head::ProbabilisticClassifier::classes(&classifier).len()
    );

    let encoder = SentenceEncoder::load(&settings.encoder)?;

    Ok(EmbeddingStrategy::new(Arc::new(encoder), Arc::new(classifier))?
        .with_threshold(settings.confidence_threshold))
}

#[cfg(not(feature = "ml-models"))]
fn load_embedding_strategy(settings: &EmbeddingSettings) -> Result<EmbeddingStrategy> {
    ClassifierArtifact::from_file(&settings.classifier_path)?;
    Err(Error::config(
        "embedding strategy requires the ml-models feature",
    ))
}

/// Builds the LLM client from credentials in the environment
pub struct LlmLoader {
    settings: LlmSettings,
}

impl LlmLoader {
    pub fn new(settings: LlmSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StrategyLoader for LlmLoader {
    fn name(&self) -> &str {
        "llm"
    }

    async fn load(&self) -> Result<Arc<dyn Strategy>> {
        let strategy = LlmStrategy::new(&self.settings)?;
        info!(
            "LLM fallback using {} at {}",
            self.settings.model, self.settings.base_url
        );
        Ok(Arc::new(strategy))
    }
}

/// Build the regex → embedding → LLM cascade described by `config`.
///
/// No strategy is initialized here; each one loads on the first batch and a
/// failure only marks that strategy unavailable. Disabled strategies are left
/// out entirely.
pub fn build_cascade_from_config(config: &CascadeConfig) -> Cascade {
    let mut builder = Cascade::builder().max_concurrency(config.cascade.max_concurrency);

    if config.cascade.strategy_timeout_secs > 0 {
        builder = builder.strategy_timeout(Duration::from_secs(config.cascade.strategy_timeout_secs));
    }

    if config.regex.enabled {
        builder = builder.loader(Arc::new(RegexLoader::new(config.regex.clone())));
    }
    if config.embedding.enabled {
        builder = builder.loader(Arc::new(EmbeddingLoader::new(config.embedding.clone())));
    }
    if config.llm.enabled {
        builder = builder.loader(Arc::new(LlmLoader::new(config.llm.clone())));
    }

    let cascade = builder.build();
    info!("Cascade configured with stages: {:?}", cascade.stage_names());
    cascade
}

/// Load cascade configuration from file
pub fn load_config(path: impl AsRef<Path>) -> Result<CascadeConfig> {
    CascadeConfig::from_file(path.as_ref())
        .map_err(|e| Error::config(format!("Failed to load cascade config: {}", e)))
}

/// Load cascade configuration, falling back to defaults when the file is absent
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<CascadeConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        info!(
            "Cascade config {} not found, using defaults",
            path.display()
        );
        Ok(CascadeConfig::default())
    }
}
