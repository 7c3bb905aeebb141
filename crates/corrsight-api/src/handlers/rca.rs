//! RCA service API handlers
//!
//! - GET /health - service health, reasoning readiness, dependency probes
//! - GET /status - detailed reasoning-service status and remediation hints
//! - GET /analyze - on-demand batch narrative generation

use std::sync::Arc;

use axum::{extract::Query, extract::State, response::IntoResponse, Json};
use chrono::Utc;
use corrsight_core::config::RcaConfig;
use corrsight_core::events::RcaAnalysis;
use corrsight_rca::batch::{filter_and_rank, ConfidenceRange};
use corrsight_rca::engine_client::CorrelationEngineClient;
use corrsight_rca::narrative::{RcaPipeline, ReasoningStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

/// Shared state for the RCA service handlers
#[derive(Debug, Clone)]
pub struct RcaApiState {
    pub pipeline: Arc<RcaPipeline>,
    pub engine: CorrelationEngineClient,
    pub config: RcaConfig,
}

impl RcaApiState {
    fn reasoning_status(&self) -> ReasoningStatus {
        self.pipeline.generator().status()
    }

    fn credential_status(&self) -> &'static str {
        if !self.config.credential_provided() {
            "not_provided"
        } else if self.config.credential_format_valid() {
            "valid_format"
        } else {
            "invalid_format"
        }
    }
}

/// Query parameters for GET /analyze
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub max_confidence: Option<f64>,
}

/// GET /health
#[instrument(skip(state))]
pub async fn health(State(state): State<Arc<RcaApiState>>) -> impl IntoResponse {
    let status = state.reasoning_status();
    Json(json!({
        "status": "healthy",
        "service": "rca-narrative-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.reasoning_model,
        "correlation_engine_connected": state.engine.is_reachable().await,
        "metrics_store_connected": state.pipeline.contexts().store().is_reachable().await,
        "reasoning_status": status.as_str(),
        "reasoning_details": {
            "configured": status != ReasoningStatus::NotConfigured,
            "test_passed": status == ReasoningStatus::TestedOk,
            "credential_status": state.credential_status(),
            "model": state.config.reasoning_model,
        },
        "performance": {
            "default_min_confidence": state.config.default_min_confidence,
            "default_max_confidence": state.config.default_max_confidence,
            "reasoning_timeout_seconds": state.config.reasoning_timeout_secs,
        },
        "timestamp": Utc::now(),
    }))
}

/// GET /status
#[instrument(skip(state))]
pub async fn reasoning_status(State(state): State<Arc<RcaApiState>>) -> impl IntoResponse {
    let status = state.reasoning_status();
    let (message, recommendations) = status.message_and_hints(&state.config);

    Json(json!({
        "configured": status != ReasoningStatus::NotConfigured,
        "test_passed": status == ReasoningStatus::TestedOk,
        "credential_format_valid": state.config.credential_provided()
            && state.config.credential_format_valid(),
        "model": state.config.reasoning_model,
        "status_message": message,
        "recommendations": recommendations,
        "last_checked": Utc::now(),
    }))
}

/// GET /analyze
///
/// Fetches the latest correlation events, filters them to the requested
/// confidence window, and generates one narrative per event. A failed
/// event is skipped, never fatal. There is deliberately no per-call
/// deadline on narrative generation; large live batches take as long as
/// they take.
#[instrument(skip(state))]
pub async fn analyze(
    State(state): State<Arc<RcaApiState>>,
    Query(query): Query<AnalyzeQuery>,
) -> impl IntoResponse {
    let range = ConfidenceRange::clamped(
        query.min_confidence.unwrap_or(state.config.default_min_confidence),
        query.max_confidence.unwrap_or(state.config.default_max_confidence),
    );
    info!(
        min_confidence = range.min,
        max_confidence = range.max,
        "starting batch analysis"
    );

    let events = match state.engine.latest_events().await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "correlation engine unavailable, nothing to analyze");
            Vec::new()
        }
    };

    if events.is_empty() {
        return Json(json!({ "message": "No correlation events to analyze" }));
    }

    let total = events.len();
    let selected = filter_and_rank(events, range);
    info!(
        total,
        selected = selected.len(),
        "filtered events to confidence window"
    );

    if selected.is_empty() {
        return Json(json!({
            "message": format!(
                "No correlations found in confidence range {:.2}-{:.2}",
                range.min, range.max
            ),
            "suggestion": "Try expanding the confidence range",
            "total_correlations": total,
            "filtered_correlations": 0,
            "criteria": { "min_confidence": range.min, "max_confidence": range.max },
        }));
    }

    let started = std::time::Instant::now();
    let mut analyses: Vec<RcaAnalysis> = Vec::with_capacity(selected.len());
    let selected_count = selected.len();
    for event in selected {
        analyses.push(state.pipeline.analyze_event(event).await);
    }

    let total_time = started.elapsed().as_secs_f64();
    let status = state.reasoning_status();
    info!(
        analyses = analyses.len(),
        total_time_secs = total_time,
        "batch analysis complete"
    );

    Json(json!({
        "total_correlations": total,
        "filtered_correlations": selected_count,
        "analyses_generated": analyses.len(),
        "analyses": analyses,
        "performance": {
            "total_time_seconds": total_time,
            "average_time_per_analysis": total_time / analyses.len().max(1) as f64,
        },
        "criteria": { "min_confidence": range.min, "max_confidence": range.max },
        "status": {
            "configured": status != ReasoningStatus::NotConfigured,
            "test_passed": status == ReasoningStatus::TestedOk,
        },
        "timestamp": Utc::now(),
    }))
}
