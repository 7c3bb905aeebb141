//! Metrics-store query client.
//!
//! Speaks the Prometheus HTTP API as a black-box contract: range queries
//! return label-partitioned series of (timestamp, value) pairs, instant
//! queries return the latest sample per series. Every call carries an
//! explicit deadline; deadline-exceeded and connection failures surface
//! as `Error::DependencyUnavailable`.

use chrono::{DateTime, Utc};
use corrsight_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Configuration for the metrics-store client
#[derive(Debug, Clone)]
pub struct MetricsStoreConfig {
    /// Base URL, e.g. "http://prometheus:9090"
    pub base_url: String,
    /// Range-query step in seconds
    pub step_secs: u64,
    /// Deadline for range queries
    pub range_timeout: Duration,
    /// Deadline for instant queries and reachability probes
    pub instant_timeout: Duration,
}

impl Default for MetricsStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://prometheus:9090".to_string(),
            step_secs: 60,
            range_timeout: Duration::from_secs(10),
            instant_timeout: Duration::from_secs(5),
        }
    }
}

/// One label-partitioned series from a range query
#[derive(Debug, Clone)]
pub struct RangeSeries {
    /// (timestamp in milliseconds, value) pairs as returned by the store
    pub points: Vec<(i64, f64)>,
}

// Wire format of the store's query responses. Values arrive as
// [unix_seconds, "string value"] pairs.

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    status: String,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeData {
    #[serde(default)]
    result: Vec<RangeResult>,
}

#[derive(Debug, Deserialize)]
struct RangeResult {
    #[serde(default)]
    values: Vec<(f64, String)>,
}

#[derive(Debug, Default, Deserialize)]
struct InstantData {
    #[serde(default)]
    result: Vec<InstantResult>,
}

#[derive(Debug, Deserialize)]
struct InstantResult {
    value: (f64, String),
}

/// Client for the metrics-store query protocol
#[derive(Debug, Clone)]
pub struct MetricsStoreClient {
    config: MetricsStoreConfig,
    http: reqwest::Client,
}

impl MetricsStoreClient {
    pub fn new(config: MetricsStoreConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &MetricsStoreConfig {
        &self.config
    }

    /// Range query over [start, end] at the configured step.
    ///
    /// Returns one entry per label partition. An empty result list is a
    /// valid response, not an error.
    pub async fn range_query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RangeSeries>> {
        let url = format!("{}/api/v1/query_range", self.config.base_url);
        let start_ts = start.timestamp().to_string();
        let end_ts = end.timestamp().to_string();
        let step = self.config.step_secs.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", expr),
                ("start", start_ts.as_str()),
                ("end", end_ts.as_str()),
                ("step", step.as_str()),
            ])
            .timeout(self.config.range_timeout)
            .send()
            .await
            .map_err(|e| Error::dependency(format!("metrics store range query: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::protocol(format!(
                "metrics store returned HTTP {} for range query",
                response.status()
            )));
        }

        let body: QueryResponse<RangeData> = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed range response: {e}")))?;

        if body.status != "success" {
            return Err(Error::protocol(format!(
                "metrics store range query status: {}",
                body.status
            )));
        }

        let results = body.data.map(|d| d.result).unwrap_or_default();
        let series = results
            .into_iter()
            .map(|r| RangeSeries {
                points: parse_value_pairs(&r.values),
            })
            .filter(|s| !s.points.is_empty())
            .collect();

        Ok(series)
    }

    /// Instant query: latest value of the first matching series, as the
    /// raw string the store returned.
    pub async fn instant_query(&self, expr: &str) -> Result<Option<String>> {
        let url = format!("{}/api/v1/query", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("query", expr)])
            .timeout(self.config.instant_timeout)
            .send()
            .await
            .map_err(|e| Error::dependency(format!("metrics store instant query: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::protocol(format!(
                "metrics store returned HTTP {} for instant query",
                response.status()
            )));
        }

        let body: QueryResponse<InstantData> = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed instant response: {e}")))?;

        if body.status != "success" {
            return Ok(None);
        }

        Ok(body
            .data
            .and_then(|d| d.result.into_iter().next())
            .map(|r| r.value.1))
    }

    /// Whether the store answers at all. Used by health endpoints only.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/api/v1/targets", self.config.base_url);
        match self
            .http
            .get(&url)
            .timeout(self.config.instant_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "metrics store reachability probe failed");
                false
            }
        }
    }
}

/// Parse the store's [seconds, "value"] pairs, dropping entries that do
/// not parse as finite numbers (NaN markers, stale values).
fn parse_value_pairs(values: &[(f64, String)]) -> Vec<(i64, f64)> {
    values
        .iter()
        .filter_map(|(ts, raw)| {
            let value: f64 = raw.parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            Some(((ts * 1000.0) as i64, value))
        })
        .collect()
}
