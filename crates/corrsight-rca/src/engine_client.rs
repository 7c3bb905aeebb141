//! Client for the correlation analyzer service.
//!
//! The RCA pipeline is a downstream consumer of the analyzer's HTTP
//! API: it reads the latest run's events and probes /health for its own
//! health report.

use corrsight_core::events::CorrelationEvent;
use corrsight_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// The latest-run response body carries either a full run or just an
// explanatory message; both deserialize here, with no correlations in
// the message case.
#[derive(Debug, Deserialize)]
struct LatestRunResponse {
    #[serde(default)]
    correlations: Vec<CorrelationEvent>,
}

/// HTTP client for the correlation analyzer
#[derive(Debug, Clone)]
pub struct CorrelationEngineClient {
    http: reqwest::Client,
    base_url: String,
}

impl CorrelationEngineClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Events from the analyzer's most recent run. An analyzer that has
    /// not completed a run yet yields an empty list.
    pub async fn latest_events(&self) -> Result<Vec<CorrelationEvent>> {
        let url = format!("{}/correlations/latest", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::dependency(format!("correlation engine: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::protocol(format!(
                "correlation engine returned HTTP {}",
                response.status()
            )));
        }

        let body: LatestRunResponse = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed correlation response: {e}")))?;

        Ok(body.correlations)
    }

    /// Whether the analyzer answers /health. Used by health reporting.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "correlation engine reachability probe failed");
                false
            }
        }
    }
}
