//! Point-in-time metric context.
//!
//! One instant query per metric, plus a banded interpretation of the
//! parsed value. The interpretation is a pure function of the metric
//! name and raw value string; any fetch failure degrades to the value
//! "unknown" rather than an error.

use chrono::Utc;
use corrsight_core::events::MetricContext;
use corrsight_ingestion::store::MetricsStoreClient;
use tracing::debug;

/// Builds `MetricContext` values from instant queries
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    store: MetricsStoreClient,
}

impl ContextBuilder {
    pub fn new(store: MetricsStoreClient) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MetricsStoreClient {
        &self.store
    }

    /// Current context for one metric. Never fails: a store error or a
    /// missing series yields `current_value = "unknown"`.
    pub async fn build(&self, metric: &str) -> MetricContext {
        let current_value = match self.store.instant_query(metric).await {
            Ok(Some(value)) => value,
            Ok(None) => "unknown".to_string(),
            Err(e) => {
                debug!(metric, error = %e, "instant query failed, context degraded");
                "unknown".to_string()
            }
        };

        MetricContext {
            metric: metric.to_string(),
            interpretation: interpret_metric(metric, &current_value),
            current_value,
            timestamp: Utc::now(),
        }
    }
}

/// Banded interpretation of a metric value.
///
/// Band selection keys off name families; unrecognized names and
/// unparseable values fall through to a plain "Current value" echo.
pub fn interpret_metric(metric: &str, value: &str) -> String {
    let Ok(val) = value.parse::<f64>() else {
        return format!("Current value: {value}");
    };

    if metric.contains("cpu_usage") {
        if val > 0.8 {
            format!("HIGH CPU usage at {} (Critical: >80%)", percent(val))
        } else if val > 0.6 {
            format!("ELEVATED CPU usage at {} (Warning: >60%)", percent(val))
        } else {
            format!("NORMAL CPU usage at {}", percent(val))
        }
    } else if metric.contains("memory_usage") {
        if val > 0.85 {
            format!("HIGH memory usage at {} (Critical: >85%)", percent(val))
        } else if val > 0.7 {
            format!("ELEVATED memory usage at {} (Warning: >70%)", percent(val))
        } else {
            format!("NORMAL memory usage at {}", percent(val))
        }
    } else if metric.contains("cache_hit_ratio") {
        if val < 0.6 {
            format!("POOR cache performance at {} hit ratio (Target: >80%)", percent(val))
        } else if val < 0.8 {
            format!("DEGRADED cache performance at {} hit ratio", percent(val))
        } else {
            format!("GOOD cache performance at {} hit ratio", percent(val))
        }
    } else if metric.contains("up") {
        if val == 1.0 {
            "SERVICE UP".to_string()
        } else {
            "SERVICE DOWN".to_string()
        }
    } else if metric.contains("response_time") || metric.contains("duration") {
        if val > 2.0 {
            format!("SLOW response time at {val:.2}s (Target: <0.3s)")
        } else if val > 0.5 {
            format!("DEGRADED response time at {val:.2}s")
        } else {
            format!("GOOD response time at {val:.2}s")
        }
    } else {
        format!("Current value: {value}")
    }
}

fn percent(val: f64) -> String {
    format!("{:.1}%", val * 100.0)
}
