//! Configuration for the cascade and its strategies

use crate::rules::RegexRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the whole cascade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Rule-based first stage
    #[serde(default)]
    pub regex: RegexSettings,

    /// Embedding classifier second stage
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// LLM fallback stage
    #[serde(default)]
    pub llm: LlmSettings,

    /// Orchestration knobs
    #[serde(default)]
    pub cascade: OrchestrationSettings,
}

/// Regex stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prepend the built-in rule table
    #[serde(default = "default_true")]
    pub include_defaults: bool,

    #[serde(default = "default_true")]
    pub case_insensitive: bool,

    /// Additional rules, tried after the defaults in declaration order
    #[serde(default)]
    pub rules: Vec<RegexRule>,
}

impl Default for RegexSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            include_defaults: true,
            case_insensitive: true,
            rules: Vec::new(),
        }
    }
}

/// Embedding stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub encoder: EncoderSettings,

    /// Offline-trained classifier artifact (JSON)
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            encoder: EncoderSettings::default(),
            classifier_path: default_classifier_path(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Sentence encoder settings.
///
/// A local `path` takes precedence over the Hugging Face `repo_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Local directory with config.json, tokenizer.json and model.safetensors
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_encoder_repo")]
    pub repo_id: String,

    #[serde(default)]
    pub revision: Option<String>,

    /// cpu, cuda or metal
    #[serde(default = "default_device")]
    pub device: String,

    /// Token limit; longer messages are truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// L2-normalize pooled embeddings
    #[serde(default = "default_true")]
    pub normalize: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            path: None,
            repo_id: default_encoder_repo(),
            revision: None,
            device: default_device(),
            max_length: default_max_length(),
            normalize: true,
        }
    }
}

/// Where encoder weights come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderSource {
    Local { path: PathBuf },
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

impl EncoderSettings {
    /// Resolved weight source
    pub fn source(&self) -> EncoderSource {
        match &self.path {
            Some(path) => EncoderSource::Local { path: path.clone() },
            None => EncoderSource::HuggingFace {
                repo_id: self.repo_id.clone(),
                revision: self.revision.clone(),
            },
        }
    }
}

/// LLM stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible API root
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub temperature: f32,

    /// Per-request timeout
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Categories offered to the model
    #[serde(default = "default_llm_categories")]
    pub categories: Vec<String>,

    /// Downgrade answers outside `categories` to the sentinel
    #[serde(default)]
    pub restrict_to_categories: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            timeout_secs: default_llm_timeout(),
            categories: default_llm_categories(),
            restrict_to_categories: false,
        }
    }
}

/// Cascade-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationSettings {
    /// Records classified concurrently within a batch (1 = sequential)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upper bound on a single strategy invocation (0 disables)
    #[serde(default = "default_strategy_timeout")]
    pub strategy_timeout_secs: u64,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            strategy_timeout_secs: default_strategy_timeout(),
        }
    }
}

impl CascadeConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }
}

fn default_true() -> bool {
    true
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("./models/log_classifier.json")
}

fn default_confidence_threshold() -> f32 {
    crate::embedding::DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_encoder_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    256
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_llm_categories() -> Vec<String> {
    vec!["Workflow Error".to_string(), "Deprecation Warning".to_string()]
}

fn default_max_concurrency() -> usize {
    1
}

fn default_strategy_timeout() -> u64 {
    30
}
