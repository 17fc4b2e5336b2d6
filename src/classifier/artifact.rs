//! Trained model artifact
//!
//! JSON export of the offline training job: a linear model over TF-IDF
//! features of the URL text. Two capability variants exist, selected by the
//! `kind` field at load time: a probabilistic classifier (sigmoid over the
//! decision value) and a hard-label classifier (sign of the decision value).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("inconsistent model artifact: {0}")]
    Inconsistent(String),
}

/// Capability variant of the exported model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Exposes class probabilities
    Probabilistic,
    /// Exposes only a hard label; probability is reported as 1.0 or 0.0
    HardLabel,
}

#[derive(Debug, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub kind: ModelKind,
    /// term -> feature index
    vocabulary: HashMap<String, usize>,
    /// per-index inverse document frequency weight
    idf: Vec<f64>,
    /// per-index linear coefficient
    coef: Vec<f64>,
    intercept: f64,
}

impl ModelArtifact {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.idf.len() != self.coef.len() {
            return Err(ArtifactError::Inconsistent(format!(
                "idf has {} entries but coef has {}",
                self.idf.len(),
                self.coef.len()
            )));
        }
        if let Some((term, index)) = self
            .vocabulary
            .iter()
            .find(|(_, index)| **index >= self.coef.len())
        {
            return Err(ArtifactError::Inconsistent(format!(
                "vocabulary term '{}' maps to index {} beyond {} features",
                term,
                index,
                self.coef.len()
            )));
        }
        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        self.coef.len()
    }

    /// Malicious-class probability for a URL
    pub fn probability(&self, url: &str) -> f64 {
        let decision = self.decision(url);
        match self.kind {
            ModelKind::Probabilistic => sigmoid(decision),
            ModelKind::HardLabel => {
                if decision >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Linear decision value w·x + b over L2-normalized TF-IDF features
    fn decision(&self, url: &str) -> f64 {
        let mut features: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(url) {
            if let Some(&index) = self.vocabulary.get(token.as_str()) {
                *features.entry(index).or_insert(0.0) += self.idf[index];
            }
        }

        let norm = features.values().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return self.intercept;
        }

        let dot: f64 = features
            .iter()
            .map(|(&index, value)| self.coef[index] * value / norm)
            .sum();
        dot + self.intercept
    }
}

/// Lowercase word tokens of length >= 2, split on non-alphanumeric characters
fn tokenize(url: &str) -> Vec<String> {
    url.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_string)
        .collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(kind: ModelKind) -> ModelArtifact {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("login".to_string(), 0);
        vocabulary.insert("example".to_string(), 1);
        ModelArtifact {
            version: "test-model".to_string(),
            kind,
            vocabulary,
            idf: vec![2.0, 1.0],
            coef: vec![3.0, -1.0],
            intercept: -0.5,
        }
    }

    #[test]
    fn probabilistic_model_stays_in_unit_interval() {
        let model = artifact(ModelKind::Probabilistic);
        for url in [
            "http://login.example.com",
            "http://example.com",
            "ftp://nothing-known-here.net",
        ] {
            let p = model.probability(url);
            assert!((0.0..=1.0).contains(&p), "probability {} out of range", p);
        }
    }

    #[test]
    fn suspicious_terms_raise_the_score() {
        let model = artifact(ModelKind::Probabilistic);
        let suspicious = model.probability("http://login.login.com");
        let clean = model.probability("http://example.com");
        assert!(suspicious > clean);
    }

    #[test]
    fn hard_label_model_reports_zero_or_one() {
        let model = artifact(ModelKind::HardLabel);
        let p = model.probability("http://login.example.com");
        assert!(p == 0.0 || p == 1.0);

        // unknown tokens only: decision is the (negative) intercept
        assert_eq!(model.probability("zz://qq.ww"), 0.0);
    }

    #[test]
    fn unknown_tokens_fall_back_to_intercept() {
        let model = artifact(ModelKind::Probabilistic);
        let p = model.probability("gopher://unknown-host.tld");
        assert!((p - sigmoid(-0.5)).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_out_of_range_vocabulary() {
        let mut model = artifact(ModelKind::Probabilistic);
        model.vocabulary.insert("overflow".to_string(), 99);
        assert!(matches!(
            model.validate(),
            Err(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn validate_rejects_mismatched_weights() {
        let mut model = artifact(ModelKind::Probabilistic);
        model.idf.push(1.0);
        assert!(matches!(
            model.validate(),
            Err(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        let tokens = tokenize("http://Secure-Login.example.com/a");
        assert!(tokens.contains(&"secure".to_string()));
        assert!(tokens.contains(&"login".to_string()));
        assert!(tokens.contains(&"example".to_string()));
        // single-character fragments are dropped
        assert!(!tokens.contains(&"a".to_string()));
    }
}
