//! Embedding strategy (second stage)
//!
//! Encodes the message with a sentence encoder and hands the vector to a
//! classifier trained offline. Low-confidence predictions are downgraded to
//! the sentinel instead of being returned as guesses.

use crate::classifier_head::{argmax, ProbabilisticClassifier};
use crate::strategy::Strategy;
use logcascade_core::{Error, Result, Verdict};
use std::sync::Arc;

/// Minimum class probability for accepting a prediction
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Maps text to a fixed-size vector
pub trait Encoder: Send + Sync {
    /// Length of every vector this encoder produces
    fn dimension(&self) -> usize;

    /// Encode a single text
    fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Sentence embedding followed by a pretrained classifier
pub struct EmbeddingStrategy {
    name: String,
    encoder: Arc<dyn Encoder>,
    classifier: Arc<dyn ProbabilisticClassifier>,
    threshold: f32,
}

impl EmbeddingStrategy {
    /// Pair an encoder with a classifier trained on its output
    pub fn new(
        encoder: Arc<dyn Encoder>,
        classifier: Arc<dyn ProbabilisticClassifier>,
    ) -> Result<Self> {
        if encoder.dimension() != classifier.input_dimension() {
            return Err(Error::model(format!(
                "encoder produces {}-dimensional vectors but classifier expects {}",
                encoder.dimension(),
                classifier.input_dimension()
            )));
        }

        Ok(Self {
            name: "embedding".to_string(),
            encoder,
            classifier,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        })
    }

    /// Override the confidence threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Configured confidence threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Encode and classify on the calling thread
fn classify_blocking(
    encoder: &dyn Encoder,
    classifier: &dyn ProbabilisticClassifier,
    threshold: f32,
    message: &str,
) -> Result<Verdict> {
    let features = encoder.encode(message)?;

    if !classifier.supports_probabilities() {
        return Ok(Verdict::from_raw(&classifier.predict(&features)?));
    }

    let probs = classifier.predict_proba(&features)?;
    let (idx, confidence) =
        argmax(&probs).ok_or_else(|| Error::model("classifier returned no probabilities"))?;

    if confidence < threshold {
        tracing::debug!(
            "Embedding confidence {:.3} below threshold {:.3}",
            confidence,
            threshold
        );
        return Ok(Verdict::Unclassified);
    }

    let class = classifier
        .classes()
        .get(idx)
        .ok_or_else(|| Error::model(format!("no class at index {}", idx)))?;

    Ok(Verdict::from_raw(class))
}

#[async_trait::async_trait]
impl Strategy for EmbeddingStrategy {
    async fn classify(&self, message: &str) -> Result<Verdict> {
        let encoder = Arc::clone(&self.encoder);
        let classifier = Arc::clone(&self.classifier);
        let threshold = self.threshold;
        let message = message.to_string();

        // Inference is CPU bound; keep it off the async workers so the
        // cascade's per-call timeout can fire
        tokio::task::spawn_blocking(move || {
            classify_blocking(encoder.as_ref(), classifier.as_ref(), threshold, &message)
        })
        .await
        .map_err(|e| Error::internal(format!("Embedding task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
