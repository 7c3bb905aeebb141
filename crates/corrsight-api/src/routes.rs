//! Router construction for both services.
//!
//! Each service gets its own flat router: the endpoint paths are part
//! of the deployed contract, with no version prefix. The exposition
//! handle carries its own state so /metrics never touches service
//! state.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::exposition::render_metrics;
use crate::handlers::correlation::{
    business_correlations, correlations_summary, effective_config, health as correlation_health,
    latest_correlations, list_correlations,
};
use crate::handlers::rca::{analyze, health as rca_health, reasoning_status};
use crate::{ApiConfig, CorrelationApiState, RcaApiState};

/// Router for the correlation analyzer service
pub fn correlation_router(
    config: &ApiConfig,
    state: Arc<CorrelationApiState>,
    exposition: PrometheusHandle,
) -> Router {
    let service_routes = Router::new()
        .route("/health", get(correlation_health))
        .route("/correlations", get(list_correlations))
        .route("/correlations/latest", get(latest_correlations))
        .route("/correlations/business", get(business_correlations))
        .route("/correlations/summary", get(correlations_summary))
        .route("/config", get(effective_config))
        .with_state(state);

    let metrics_route = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(exposition);

    service_routes
        .merge(metrics_route)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeout_secs)))
}

/// Router for the RCA narrative service
pub fn rca_router(
    config: &ApiConfig,
    state: Arc<RcaApiState>,
    exposition: PrometheusHandle,
) -> Router {
    let service_routes = Router::new()
        .route("/health", get(rca_health))
        .route("/status", get(reasoning_status))
        .route("/analyze", get(analyze))
        .with_state(state);

    let metrics_route = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(exposition);

    service_routes
        .merge(metrics_route)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeout_secs)))
}
