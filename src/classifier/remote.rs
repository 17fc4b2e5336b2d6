//! Remote URL checker client
//!
//! Delegates classification to an external checker service over HTTP with a
//! bounded per-request timeout. An outage here is the one dependency failure
//! that surfaces to callers (503), everything else in the serving path fails
//! open.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ClassifierError, Verdict};

/// Version reported when the checker response does not carry one
const REMOTE_VERSION: &str = "remote-v1";

pub struct RemoteChecker {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    malicious: bool,
    malicious_prob: f64,
    model_version: Option<String>,
}

impl RemoteChecker {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn version(&self) -> &str {
        REMOTE_VERSION
    }

    /// POST {base}/check and map any transport or status failure to
    /// `ClassifierError::Unavailable`
    pub async fn check(&self, url: &str) -> Result<Verdict, ClassifierError> {
        let endpoint = format!("{}/check", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&endpoint)
            .timeout(self.timeout)
            .json(&CheckRequest { url })
            .send()
            .await
            .map_err(|err| ClassifierError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "checker returned status {}",
                response.status()
            )));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|err| ClassifierError::Unavailable(err.to_string()))?;

        Ok(Verdict {
            malicious_prob: body.malicious_prob,
            malicious: body.malicious,
            model_version: body.model_version.unwrap_or_else(|| REMOTE_VERSION.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_checker_reports_unavailable() {
        // Reserved port, nothing listening
        let checker = RemoteChecker::new(
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(200),
        );

        let result = checker.check("http://example.com").await;
        assert!(matches!(result, Err(ClassifierError::Unavailable(_))));
    }

    #[test]
    fn check_response_tolerates_missing_version() {
        let body: CheckResponse =
            serde_json::from_str(r#"{"malicious": true, "malicious_prob": 0.8}"#).unwrap();
        assert!(body.malicious);
        assert!(body.model_version.is_none());
    }
}
