//! Candle sentence-transformer encoder
//!
//! Runs a BERT-family sentence-transformer (all-MiniLM-L6-v2 by default),
//! mean-pools the token embeddings over the attention mask and optionally
//! L2-normalizes the result, matching what sentence-transformers does for
//! these checkpoints.

use crate::config::{EncoderSettings, EncoderSource};
use crate::embedding::Encoder;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use logcascade_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationDirection};

const REQUIRED_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Subset of config.json needed to size the output
#[derive(Deserialize)]
struct EncoderDims {
    hidden_size: usize,
}

/// BERT sentence encoder running on Candle
pub struct SentenceEncoder {
    tokenizer: Tokenizer,
    model: BertModel,
    device: Device,
    dimension: usize,
    max_length: usize,
    normalize: bool,
}

impl SentenceEncoder {
    /// Resolve, download if needed, and load the encoder weights
    pub fn load(settings: &EncoderSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(&settings.source())?;
        let device = get_device(&settings.device)?;

        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig = parse_json_config(&config_path)?;
        let dims: EncoderDims = parse_json_config(&config_path)?;

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| Error::model(format!("Failed to load tokenizer.json: {}", e)))?;

        let vb = load_var_builder(&model_dir, &device)?;
        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| Error::model(format!("Failed to load BERT weights: {}", e)))?;

        tracing::info!(
            "Loaded sentence encoder from {} (dim={}, device={})",
            model_dir.display(),
            dims.hidden_size,
            settings.device
        );

        Ok(Self {
            tokenizer,
            model,
            device,
            dimension: dims.hidden_size,
            max_length: settings.max_length,
            normalize: settings.normalize,
        })
    }

    fn forward(&self, text: &str) -> Result<(Vec<Vec<f32>>, Vec<u32>)> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::model(format!("Tokenization failed: {}", e)))?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let attention_mask: Vec<u32> = encoding.get_attention_mask().to_vec();

        let input_ids = to_batch_tensor(encoding.get_ids(), &self.device, "input ids")?;
        let token_type_ids =
            to_batch_tensor(encoding.get_type_ids(), &self.device, "token type ids")?;
        let mask = to_batch_tensor(&attention_mask, &self.device, "attention mask")?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&mask))
            .map_err(|e| Error::model(format!("Encoder forward pass failed: {}", e)))?;

        let token_embeddings: Vec<Vec<f32>> = hidden_states
            .squeeze(0)
            .map_err(|e| Error::model(format!("Failed to squeeze hidden states: {}", e)))?
            .to_vec2()
            .map_err(|e| Error::model(format!("Failed to read hidden states: {}", e)))?;

        Ok((token_embeddings, attention_mask))
    }
}

impl Encoder for SentenceEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let (token_embeddings, attention_mask) = self.forward(text)?;
        let mut pooled = mean_pool(&token_embeddings, &attention_mask);
        if self.normalize {
            l2_normalize(&mut pooled);
        }
        Ok(pooled)
    }
}

fn to_batch_tensor(values: &[u32], device: &Device, what: &str) -> Result<Tensor> {
    Tensor::new(values, device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(|e| Error::model(format!("Failed to build {} tensor: {}", what, e)))
}

fn resolve_model_dir(source: &EncoderSource) -> Result<PathBuf> {
    match source {
        EncoderSource::Local { path } => {
            if !path.exists() {
                return Err(Error::model(format!(
                    "Encoder path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        EncoderSource::HuggingFace { repo_id, revision } => {
            download_from_huggingface(repo_id, revision.as_deref())
        }
    }
}

fn download_from_huggingface(repo_id: &str, revision: Option<&str>) -> Result<PathBuf> {
    tracing::info!(
        "Fetching encoder from HuggingFace: {} @ {}",
        repo_id,
        revision.unwrap_or("main")
    );

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logcascade/hf");

    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(cache_dir)
        .build()
        .map_err(|e| Error::model(format!("Failed to initialize HuggingFace API: {}", e)))?;

    let repo = api.repo(hf_hub::Repo::with_revision(
        repo_id.to_string(),
        hf_hub::RepoType::Model,
        revision.unwrap_or("main").to_string(),
    ));

    let mut model_dir = None;
    for file in REQUIRED_FILES {
        tracing::debug!("Downloading {}", file);
        let path = repo
            .get(file)
            .map_err(|e| Error::model(format!("Failed to download {}: {}", file, e)))?;
        model_dir = path.parent().map(Path::to_path_buf);
    }

    model_dir.ok_or_else(|| Error::model(format!("No files resolved for {}", repo_id)))
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::model(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::model(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

/// Average of the token embeddings the attention mask keeps
pub fn mean_pool(token_embeddings: &[Vec<f32>], attention_mask: &[u32]) -> Vec<f32> {
    if token_embeddings.is_empty() {
        return Vec::new();
    }

    let hidden_dim = token_embeddings[0].len();
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut token_count = 0.0f32;

    for (idx, embedding) in token_embeddings.iter().enumerate() {
        if attention_mask.get(idx).copied().unwrap_or(0) == 0 {
            continue;
        }

        token_count += 1.0;
        for (j, value) in embedding.iter().enumerate() {
            pooled[j] += value;
        }
    }

    // Fully masked input: fall back to every token
    if token_count == 0.0 {
        token_count = token_embeddings.len() as f32;
        for embedding in token_embeddings {
            for (j, value) in embedding.iter().enumerate() {
                pooled[j] += value;
            }
        }
    }

    for value in &mut pooled {
        *value /= token_count;
    }

    pooled
}

/// Scale a vector to unit length in place; zero vectors are left alone
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
