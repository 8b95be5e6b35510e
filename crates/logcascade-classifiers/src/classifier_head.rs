//! Offline-trained classifiers applied to sentence embeddings

use logcascade_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A classifier over fixed-size feature vectors
pub trait ProbabilisticClassifier: Send + Sync {
    /// Class labels, in output order
    fn classes(&self) -> &[String];

    /// Expected feature vector length
    fn input_dimension(&self) -> usize;

    /// Whether [`predict_proba`](Self::predict_proba) is supported
    fn supports_probabilities(&self) -> bool;

    /// Per-class probabilities, aligned with [`classes`](Self::classes)
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>>;

    /// Most likely class
    fn predict(&self, features: &[f32]) -> Result<String>;
}

/// Serialized classifier, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    /// Linear model with class probabilities
    LogisticRegression(LogisticRegression),

    /// Cosine nearest-centroid model without probabilities
    NearestCentroid(NearestCentroid),
}

impl ClassifierArtifact {
    /// Load and validate an artifact from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Load and validate an artifact from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::model(format!(
                "Failed to read classifier artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    fn inner(&self) -> &dyn ProbabilisticClassifier {
        match self {
            Self::LogisticRegression(model) => model,
            Self::NearestCentroid(model) => model,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::LogisticRegression(model) => model.validate(),
            Self::NearestCentroid(model) => model.validate(),
        }
    }
}

impl ProbabilisticClassifier for ClassifierArtifact {
    fn classes(&self) -> &[String] {
        self.inner().classes()
    }

    fn input_dimension(&self) -> usize {
        self.inner().input_dimension()
    }

    fn supports_probabilities(&self) -> bool {
        self.inner().supports_probabilities()
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.inner().predict_proba(features)
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        self.inner().predict(features)
    }
}

/// Logistic regression in the layout scikit-learn exports.
///
/// A binary model has a single coefficient row scoring the second class and
/// uses the sigmoid; a multiclass model has one row per class and uses
/// softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
}

impl LogisticRegression {
    fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(Error::model("logistic regression needs at least two classes"));
        }

        let expected_rows = if self.classes.len() == 2 {
            1
        } else {
            self.classes.len()
        };
        if self.coef.len() != expected_rows || self.intercept.len() != expected_rows {
            return Err(Error::model(format!(
                "logistic regression with {} classes needs {} coefficient rows and intercepts, got {} and {}",
                self.classes.len(),
                expected_rows,
                self.coef.len(),
                self.intercept.len()
            )));
        }

        validate_rows(&self.coef)
    }

    fn decision(&self, features: &[f32]) -> Result<Vec<f32>> {
        check_dimension(self.input_dimension(), features)?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, bias)| dot(row, features) + bias)
            .collect())
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn input_dimension(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn supports_probabilities(&self) -> bool {
        true
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        let scores = self.decision(features)?;
        if scores.len() == 1 {
            let positive = sigmoid(scores[0]);
            Ok(vec![1.0 - positive, positive])
        } else {
            Ok(softmax(&scores))
        }
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        let probs = self.predict_proba(features)?;
        let (idx, _) = argmax(&probs)
            .ok_or_else(|| Error::model("classifier produced no probabilities"))?;
        Ok(self.classes[idx].clone())
    }
}

/// Assigns the class whose centroid is most similar by cosine similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestCentroid {
    pub classes: Vec<String>,
    pub centroids: Vec<Vec<f32>>,
}

impl NearestCentroid {
    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() || self.classes.len() != self.centroids.len() {
            return Err(Error::model(format!(
                "nearest centroid needs one centroid per class, got {} classes and {} centroids",
                self.classes.len(),
                self.centroids.len()
            )));
        }
        validate_rows(&self.centroids)
    }
}

impl ProbabilisticClassifier for NearestCentroid {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn input_dimension(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn supports_probabilities(&self) -> bool {
        false
    }

    fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f32>> {
        Err(Error::model("nearest centroid does not expose probabilities"))
    }

    fn predict(&self, features: &[f32]) -> Result<String> {
        check_dimension(self.input_dimension(), features)?;
        let similarities: Vec<f32> = self
            .centroids
            .iter()
            .map(|centroid| cosine_similarity(centroid, features))
            .collect();
        let (idx, _) = argmax(&similarities)
            .ok_or_else(|| Error::model("nearest centroid has no centroids"))?;
        Ok(self.classes[idx].clone())
    }
}

/// Index and value of the largest element
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((idx, value)),
        })
}

fn validate_rows(rows: &[Vec<f32>]) -> Result<()> {
    let dim = rows.first().map_or(0, Vec::len);
    if dim == 0 {
        return Err(Error::model("classifier weights are empty"));
    }
    if rows.iter().any(|row| row.len() != dim) {
        return Err(Error::model("classifier weight rows have inconsistent lengths"));
    }
    Ok(())
}

fn check_dimension(expected: usize, features: &[f32]) -> Result<()> {
    if features.len() != expected {
        return Err(Error::model(format!(
            "feature dimension mismatch: classifier expects {}, got {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multiclass() -> LogisticRegression {
        LogisticRegression {
            classes: vec![
                "Critical Error".to_string(),
                "Security Alert".to_string(),
                "HTTP Status".to_string(),
            ],
            coef: vec![vec![4.0, 0.0], vec![0.0, 4.0], vec![-2.0, -2.0]],
            intercept: vec![0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_softmax_probabilities_sum_to_one() {
        let model = multiclass();
        let probs = model.predict_proba(&[1.0, 0.0]).unwrap();

        assert_eq!(probs.len(), 3);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5, "sum was {}", total);
        assert!(probs[0] > 0.9);
        assert_eq!(model.predict(&[1.0, 0.0]).unwrap(), "Critical Error");
        assert_eq!(model.predict(&[0.0, 1.0]).unwrap(), "Security Alert");
    }

    #[test]
    fn test_binary_uses_sigmoid() {
        let model = LogisticRegression {
            classes: vec!["benign".to_string(), "Security Alert".to_string()],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };

        let probs = model.predict_proba(&[0.0]).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);

        assert_eq!(model.predict(&[3.0]).unwrap(), "Security Alert");
        assert_eq!(model.predict(&[-3.0]).unwrap(), "benign");
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let model = multiclass();
        assert!(model.predict_proba(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_nearest_centroid() {
        let model = NearestCentroid {
            classes: vec!["Resource Usage".to_string(), "User Action".to_string()],
            centroids: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };

        assert!(!model.supports_probabilities());
        assert!(model.predict_proba(&[1.0, 0.0]).is_err());
        assert_eq!(model.predict(&[0.9, 0.1]).unwrap(), "Resource Usage");
        assert_eq!(model.predict(&[0.2, 0.7]).unwrap(), "User Action");
    }

    #[test]
    fn test_artifact_from_json() {
        let json = r#"{
            "kind": "logistic_regression",
            "classes": ["a", "b", "c"],
            "coef": [[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]],
            "intercept": [0.0, 0.0, 0.0]
        }"#;

        let artifact = ClassifierArtifact::from_json(json).unwrap();
        assert!(artifact.supports_probabilities());
        assert_eq!(artifact.input_dimension(), 2);
        assert_eq!(artifact.classes().len(), 3);
    }

    #[test]
    fn test_artifact_validation() {
        let ragged = r#"{
            "kind": "nearest_centroid",
            "classes": ["a", "b"],
            "centroids": [[1.0, 0.0], [1.0]]
        }"#;
        assert!(ClassifierArtifact::from_json(ragged).is_err());

        let wrong_rows = r#"{
            "kind": "logistic_regression",
            "classes": ["a", "b", "c"],
            "coef": [[1.0]],
            "intercept": [0.0]
        }"#;
        assert!(ClassifierArtifact::from_json(wrong_rows).is_err());

        let unknown = r#"{"kind": "random_forest"}"#;
        assert!(ClassifierArtifact::from_json(unknown).is_err());
    }

    #[test]
    fn test_missing_artifact_file() {
        let result = ClassifierArtifact::from_file("/nonexistent/log_classifier.json");
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.2, 0.7, 0.1]), Some((1, 0.7)));
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    }
}
