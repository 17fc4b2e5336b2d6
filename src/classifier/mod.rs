//! URL classifier adapter
//!
//! Wraps the trained model artifact behind a single `classify` entry point.
//! Resolution happens once at startup: remote delegation when a checker
//! service is configured, otherwise the local artifact, otherwise the
//! lexical heuristic.

pub mod artifact;
pub mod remote;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use artifact::ModelArtifact;
use remote::RemoteChecker;

/// Version reported when no trained artifact could be loaded
pub const HEURISTIC_VERSION: &str = "heuristic-v1";

/// Substrings that raise the heuristic score, each counted at most once
const SUSPICIOUS_TOKENS: [&str; 5] = ["login", "secure", "bank", "update", "verify"];

/// Score contributed by each matched token type
const TOKEN_WEIGHT: f64 = 0.3;

/// Threshold above which a URL is labeled malicious
pub const MALICIOUS_THRESHOLD: f64 = 0.5;

/// Classification outcome for a single URL
#[derive(Debug, Clone)]
pub struct Verdict {
    pub malicious_prob: f64,
    pub malicious: bool,
    pub model_version: String,
}

impl Verdict {
    fn from_probability(probability: f64, model_version: String) -> Self {
        Self {
            malicious_prob: probability,
            malicious: probability >= MALICIOUS_THRESHOLD,
            model_version,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("url checker unavailable: {0}")]
    Unavailable(String),
}

/// Classifier selected at startup
pub enum Classifier {
    Local(LocalClassifier),
    Remote(RemoteChecker),
}

impl Classifier {
    /// Resolve the classifier from configuration.
    ///
    /// Artifact load failures of any kind downgrade to the heuristic; only
    /// the chosen mode is logged, never surfaced to callers.
    pub fn from_config(config: &Config) -> Self {
        if let Some(base) = &config.url_checker_base {
            tracing::info!("Delegating predictions to URL checker at {}", base);
            return Classifier::Remote(RemoteChecker::new(
                base.clone(),
                Duration::from_secs(config.url_checker_timeout_seconds),
            ));
        }

        Classifier::Local(LocalClassifier::load(Path::new(&config.model_path)))
    }

    /// Model version reported at startup
    pub fn model_version(&self) -> &str {
        match self {
            Classifier::Local(local) => local.version(),
            Classifier::Remote(remote) => remote.version(),
        }
    }

    /// Classify a URL. Only the remote mode can fail; the local path always
    /// produces a verdict.
    pub async fn classify(&self, url: &str) -> Result<Verdict, ClassifierError> {
        match self {
            Classifier::Local(local) => Ok(local.predict(url)),
            Classifier::Remote(remote) => remote.check(url).await,
        }
    }
}

/// In-process classifier: trained artifact when available, heuristic otherwise
pub struct LocalClassifier {
    model: Option<ModelArtifact>,
    version: String,
}

impl LocalClassifier {
    /// Load the model artifact, falling back to the heuristic on any failure
    pub fn load(path: &Path) -> Self {
        match ModelArtifact::load(path) {
            Ok(model) => {
                tracing::info!(
                    "Loaded model artifact {} ({} features)",
                    model.version,
                    model.feature_count()
                );
                Self {
                    version: model.version.clone(),
                    model: Some(model),
                }
            }
            Err(err) => {
                tracing::warn!("Model artifact unavailable ({}), using lexical heuristic", err);
                Self::heuristic_only()
            }
        }
    }

    /// Classifier with no artifact, scoring by lexical heuristic alone
    pub fn heuristic_only() -> Self {
        Self {
            model: None,
            version: HEURISTIC_VERSION.to_string(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn predict(&self, url: &str) -> Verdict {
        let probability = match &self.model {
            Some(model) => model.probability(url),
            None => heuristic_score(url),
        };
        Verdict::from_probability(probability, self.version.clone())
    }
}

/// Lexical fallback score: 0.3 per suspicious token type present, capped at 1.0
fn heuristic_score(url: &str) -> f64 {
    let lowered = url.to_lowercase();
    let hits = SUSPICIOUS_TOKENS
        .iter()
        .filter(|token| lowered.contains(*token))
        .count();
    (hits as f64 * TOKEN_WEIGHT).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn heuristic_scores_known_urls() {
        let clf = LocalClassifier::heuristic_only();

        // secure + login + bank
        let verdict = clf.predict("http://secure-login-bank.com");
        assert!((verdict.malicious_prob - 0.9).abs() < 1e-9);
        assert!(verdict.malicious);

        let clean = clf.predict("http://example.com");
        assert_eq!(clean.malicious_prob, 0.0);
        assert!(!clean.malicious);
    }

    #[test]
    fn heuristic_clamps_to_one() {
        let clf = LocalClassifier::heuristic_only();
        let verdict = clf.predict("http://login-secure-bank-update-verify.com");
        assert_eq!(verdict.malicious_prob, 1.0);
        assert!(verdict.malicious);
    }

    #[test]
    fn heuristic_is_case_insensitive_and_deterministic() {
        let clf = LocalClassifier::heuristic_only();
        let a = clf.predict("http://SECURE-Login.example");
        let b = clf.predict("http://SECURE-Login.example");
        assert_eq!(a.malicious_prob, b.malicious_prob);
        assert!((a.malicious_prob - 0.6).abs() < 1e-9);
        assert!(a.malicious_prob >= 0.0 && a.malicious_prob <= 1.0);
    }

    #[test]
    fn each_token_type_counts_once() {
        let clf = LocalClassifier::heuristic_only();
        let verdict = clf.predict("http://login.login.login.example");
        assert!((verdict.malicious_prob - 0.3).abs() < 1e-9);
        assert!(!verdict.malicious);
    }

    #[test]
    fn missing_artifact_falls_back_to_heuristic() {
        let clf = LocalClassifier::load(Path::new("/nonexistent/url_model.json"));
        assert_eq!(clf.version(), HEURISTIC_VERSION);

        let verdict = clf.predict("http://secure-login-bank.com");
        assert!((verdict.malicious_prob - 0.9).abs() < 1e-9);
    }

    #[test]
    fn corrupt_artifact_falls_back_to_heuristic() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let clf = LocalClassifier::load(file.path());
        assert_eq!(clf.version(), HEURISTIC_VERSION);
    }

    #[test]
    fn loaded_artifact_reports_its_version() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let artifact = serde_json::json!({
            "version": "tfidf-logreg-2024-09",
            "kind": "probabilistic",
            "vocabulary": {"login": 0, "example": 1},
            "idf": [2.0, 1.0],
            "coef": [1.5, -0.5],
            "intercept": -0.2
        });
        file.write_all(artifact.to_string().as_bytes()).unwrap();

        let clf = LocalClassifier::load(file.path());
        assert_eq!(clf.version(), "tfidf-logreg-2024-09");

        let verdict = clf.predict("http://login.example.com");
        assert!(verdict.malicious_prob > 0.0 && verdict.malicious_prob < 1.0);
        assert_eq!(verdict.malicious, verdict.malicious_prob >= MALICIOUS_THRESHOLD);
    }
}
