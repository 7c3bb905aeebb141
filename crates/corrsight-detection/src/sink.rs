//! Explicit self-monitoring sink.
//!
//! Counter and gauge updates are routed through a trait injected into
//! the analyzer at construction, so the engine carries no ambient
//! metrics state and tests can run against a no-op sink.

use std::fmt::Debug;

/// Sink for the analyzer's self-monitoring signals
pub trait AnalyzerSink: Debug + Send + Sync {
    /// One accepted correlation event, labeled by correlation type
    fn correlation_event(&self, correlation_type: &str);

    /// Latest confidence for a metric pair
    fn pair_confidence(&self, pair: &str, confidence: f64);

    /// Wall-clock duration of one analysis tick
    fn tick_duration(&self, seconds: f64);
}

/// Production sink backed by the `metrics` facade; rendered by the
/// Prometheus exporter behind GET /metrics.
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerSink for PrometheusSink {
    fn correlation_event(&self, correlation_type: &str) {
        metrics::counter!(
            "correlation_events_total",
            "correlation_type" => correlation_type.to_string()
        )
        .increment(1);
    }

    fn pair_confidence(&self, pair: &str, confidence: f64) {
        metrics::gauge!(
            "correlation_confidence_score",
            "metric_pair" => pair.to_string()
        )
        .set(confidence);
    }

    fn tick_duration(&self, seconds: f64) {
        metrics::histogram!("correlation_analysis_duration_seconds").record(seconds);
    }
}

/// Sink that records nothing; used in tests
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl AnalyzerSink for NoopSink {
    fn correlation_event(&self, _correlation_type: &str) {}
    fn pair_confidence(&self, _pair: &str, _confidence: f64) {}
    fn tick_duration(&self, _seconds: f64) {}
}

/// Pair label for the confidence gauge: label selectors and common unit
/// suffixes stripped from both names.
pub fn pair_label(metric1: &str, metric2: &str) -> String {
    format!("{}_{}", clean_name(metric1), clean_name(metric2))
}

fn clean_name(metric: &str) -> String {
    let base = metric.split('{').next().unwrap_or(metric);
    base.replace("_total", "").replace("_seconds", "")
}
