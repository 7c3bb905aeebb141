//! Correlation analyzer API handlers
//!
//! Read-only views over the analysis history plus health and config:
//! - GET /health - service health and catalog sizes
//! - GET /correlations - recent runs, optional category filter
//! - GET /correlations/latest - most recent run
//! - GET /correlations/business - business events from the latest run
//! - GET /correlations/summary - aggregate view of the latest run
//! - GET /config - effective configuration and catalog

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::Query, extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use corrsight_core::catalog::MetricCatalog;
use corrsight_core::config::TierThresholds;
use corrsight_core::events::{AnalysisRun, CorrelationEvent, EventCategory};
use corrsight_detection::analyzer::CorrelationAnalyzer;
use corrsight_ingestion::store::MetricsStoreClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

/// Shared state for the correlation service handlers
#[derive(Debug, Clone)]
pub struct CorrelationApiState {
    pub analyzer: Arc<CorrelationAnalyzer>,
    /// Probed directly for /health; the analyzer only sees the fetcher
    pub store: MetricsStoreClient,
    /// Set by the analysis loop once it is running
    pub analysis_running: Arc<AtomicBool>,
}

/// Query parameters for GET /correlations
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationsQuery {
    /// Number of most recent runs to return (default 10)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Keep only events of this category within each run
    #[serde(default)]
    pub category: Option<String>,
}

/// Response for GET /correlations
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationsResponse {
    /// Runs in ascending order, oldest first
    pub correlations: Vec<AnalysisRun>,
    pub total_runs: usize,
    pub filter: String,
}

/// Response for GET /correlations/business
#[derive(Debug, Clone, Serialize)]
pub struct BusinessCorrelationsResponse {
    pub business_correlations: Vec<CorrelationEvent>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Confidence-band counts for the summary view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceBands {
    /// confidence > 0.8
    pub high: usize,
    /// 0.6 <= confidence <= 0.8
    pub medium: usize,
    /// confidence < 0.6
    pub low: usize,
}

/// Response for GET /correlations/summary
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub timestamp: DateTime<Utc>,
    pub total_correlations: usize,
    pub by_confidence: ConfidenceBands,
    pub by_significance: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_impact_severity: BTreeMap<String, usize>,
}

/// Response for GET /config
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub metrics_store_url: String,
    pub analysis_interval_secs: u64,
    pub lookback_minutes: i64,
    pub min_samples: usize,
    pub thresholds: ThresholdsResponse,
    pub monitored_metrics: MetricCatalog,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdsResponse {
    pub business: TierThresholds,
    pub cross_domain: TierThresholds,
    pub infrastructure: TierThresholds,
}

/// GET /health
#[instrument(skip(state))]
pub async fn health(State(state): State<Arc<CorrelationApiState>>) -> impl IntoResponse {
    let catalog = state.analyzer.catalog();
    Json(json!({
        "status": "healthy",
        "service": "correlation-analyzer",
        "version": env!("CARGO_PKG_VERSION"),
        "analysis_running": state.analysis_running.load(Ordering::Relaxed),
        "metrics_store_connected": state.store.is_reachable().await,
        "monitored_metrics": catalog.group_sizes(),
        "total_metrics": catalog.total_metrics(),
        "timestamp": Utc::now(),
    }))
}

/// GET /correlations
#[instrument(skip(state))]
pub async fn list_correlations(
    State(state): State<Arc<CorrelationApiState>>,
    Query(query): Query<CorrelationsQuery>,
) -> impl IntoResponse {
    let category = match query.category.as_deref().map(parse_category).transpose() {
        Ok(category) => category,
        Err(unknown) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": format!("unknown category: {unknown}"),
                    "valid_categories": ["business", "cross_domain", "infrastructure"],
                })),
            )
                .into_response();
        }
    };

    let history = state.analyzer.history();
    let limit = query.limit.unwrap_or(10);
    let mut runs: Vec<AnalysisRun> = history
        .recent(limit)
        .iter()
        .map(|run| AnalysisRun::clone(run))
        .collect();

    if let Some(category) = category {
        for run in &mut runs {
            run.correlations.retain(|e| e.category == category);
        }
    }

    Json(CorrelationsResponse {
        correlations: runs,
        total_runs: history.len(),
        filter: category.map_or_else(|| "all".to_string(), |c| c.as_str().to_string()),
    })
    .into_response()
}

/// GET /correlations/latest
#[instrument(skip(state))]
pub async fn latest_correlations(
    State(state): State<Arc<CorrelationApiState>>,
) -> impl IntoResponse {
    match state.analyzer.history().latest() {
        Some(run) => Json(serde_json::to_value(&*run).unwrap_or_default()),
        None => Json(json!({ "message": "No analysis results available yet" })),
    }
}

/// GET /correlations/business
#[instrument(skip(state))]
pub async fn business_correlations(
    State(state): State<Arc<CorrelationApiState>>,
) -> impl IntoResponse {
    let events: Vec<CorrelationEvent> = state
        .analyzer
        .history()
        .latest()
        .map(|run| {
            run.correlations
                .iter()
                .filter(|e| e.category == EventCategory::Business)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    Json(BusinessCorrelationsResponse {
        count: events.len(),
        business_correlations: events,
        timestamp: Utc::now(),
    })
}

/// GET /correlations/summary
#[instrument(skip(state))]
pub async fn correlations_summary(
    State(state): State<Arc<CorrelationApiState>>,
) -> impl IntoResponse {
    match state.analyzer.history().latest() {
        Some(run) => Json(serde_json::to_value(summarize(&run)).unwrap_or_default()),
        None => Json(json!({ "message": "No analysis results available yet" })),
    }
}

/// GET /config
#[instrument(skip(state))]
pub async fn effective_config(State(state): State<Arc<CorrelationApiState>>) -> impl IntoResponse {
    let config = state.analyzer.config();
    Json(ConfigResponse {
        metrics_store_url: config.metrics_store_url.clone(),
        analysis_interval_secs: config.analysis_interval_secs,
        lookback_minutes: config.lookback_minutes,
        min_samples: config.min_samples,
        thresholds: ThresholdsResponse {
            business: TierThresholds::BUSINESS,
            cross_domain: TierThresholds::CROSS_DOMAIN,
            infrastructure: TierThresholds::INFRASTRUCTURE,
        },
        monitored_metrics: state.analyzer.catalog().clone(),
    })
}

/// Aggregate one run into the summary view
pub(crate) fn summarize(run: &AnalysisRun) -> SummaryResponse {
    let mut by_confidence = ConfidenceBands::default();
    let mut by_significance: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_impact_severity: BTreeMap<String, usize> = BTreeMap::new();

    for event in &run.correlations {
        if event.confidence > 0.8 {
            by_confidence.high += 1;
        } else if event.confidence >= 0.6 {
            by_confidence.medium += 1;
        } else {
            by_confidence.low += 1;
        }
        *by_significance
            .entry(event.statistical_significance.as_str().to_string())
            .or_insert(0) += 1;
        *by_category
            .entry(event.category.as_str().to_string())
            .or_insert(0) += 1;
        *by_impact_severity
            .entry(event.impact_severity().to_string())
            .or_insert(0) += 1;
    }

    SummaryResponse {
        timestamp: run.timestamp,
        total_correlations: run.correlations.len(),
        by_confidence,
        by_significance,
        by_category,
        by_impact_severity,
    }
}

fn parse_category(raw: &str) -> Result<EventCategory, String> {
    match raw {
        "business" => Ok(EventCategory::Business),
        "cross_domain" => Ok(EventCategory::CrossDomain),
        "infrastructure" => Ok(EventCategory::Infrastructure),
        other => Err(other.to_string()),
    }
}
