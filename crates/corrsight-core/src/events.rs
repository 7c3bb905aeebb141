//! Domain events produced by the correlation analyzer and RCA pipeline.
//!
//! `CorrelationEvent` and `AnalysisRun` are immutable once created: the
//! analyzer builds one run per tick, appends it to history, and never
//! mutates it afterward. Serialized field names are part of the exposed
//! API contract.

use crate::catalog::MetricCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a detected correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationType {
    Positive,
    Negative,
}

impl CorrelationType {
    /// Classify from the sign of the coefficient
    pub fn from_coefficient(r: f64) -> Self {
        if r > 0.0 {
            CorrelationType::Positive
        } else {
            CorrelationType::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationType::Positive => "positive",
            CorrelationType::Negative => "negative",
        }
    }
}

impl std::fmt::Display for CorrelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistical significance band derived from the p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

impl Significance {
    /// p < 0.01 high, p < 0.05 medium, else low
    pub fn from_p_value(p: f64) -> Self {
        if p < 0.01 {
            Significance::High
        } else if p < 0.05 {
            Significance::Medium
        } else {
            Significance::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Significance::High => "high",
            Significance::Medium => "medium",
            Significance::Low => "low",
        }
    }
}

/// Which tier-level category an accepted event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Tier 1: business-to-business
    Business,
    /// Tier 2: infrastructure-to-business
    CrossDomain,
    /// Tier 3: infrastructure-internal
    Infrastructure,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Business => "business",
            EventCategory::CrossDomain => "cross_domain",
            EventCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statistically significant metric-pair correlation.
///
/// Exists in output only if it passed the acceptance thresholds of the
/// tier that discovered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEvent {
    pub metric1: String,
    pub metric2: String,
    /// Pearson coefficient in [-1, 1]
    pub correlation_coefficient: f64,
    /// Two-sided p-value in [0, 1]
    pub p_value: f64,
    /// |coefficient| — a strength proxy distinct from significance
    pub confidence: f64,
    #[serde(rename = "type")]
    pub correlation_type: CorrelationType,
    /// Aligned samples used; always >= the configured minimum
    pub sample_size: usize,
    pub category: EventCategory,
    /// e.g. "transaction_to_cache", "infrastructure_to_database"
    pub correlation_group: String,
    /// Severity-prefixed human-readable impact, e.g. "CRITICAL - ..."
    pub business_impact: String,
    pub statistical_significance: Significance,
    pub timestamp: DateTime<Utc>,
}

impl CorrelationEvent {
    /// Severity prefix of the business impact ("CRITICAL", "HIGH", ...)
    pub fn impact_severity(&self) -> &str {
        self.business_impact
            .split_once(" - ")
            .map(|(prefix, _)| prefix)
            .unwrap_or("unknown")
    }
}

/// Summary counts for one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub business_correlations: usize,
    pub cross_domain_correlations: usize,
    pub infrastructure_correlations: usize,
    pub total_correlations: usize,
    /// Business events with confidence > 0.8
    pub high_value_correlations: usize,
}

/// Result of one analysis tick. Appended to history, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub timestamp: DateTime<Utc>,
    pub correlations: Vec<CorrelationEvent>,
    pub analysis_summary: AnalysisSummary,
}

impl AnalysisRun {
    /// Build a run from accepted events, computing the summary counts
    pub fn new(timestamp: DateTime<Utc>, correlations: Vec<CorrelationEvent>) -> Self {
        let business = correlations
            .iter()
            .filter(|c| c.category == EventCategory::Business)
            .count();
        let cross_domain = correlations
            .iter()
            .filter(|c| c.category == EventCategory::CrossDomain)
            .count();
        let infrastructure = correlations
            .iter()
            .filter(|c| c.category == EventCategory::Infrastructure)
            .count();
        let high_value = correlations
            .iter()
            .filter(|c| c.category == EventCategory::Business && c.confidence > 0.8)
            .count();

        let analysis_summary = AnalysisSummary {
            business_correlations: business,
            cross_domain_correlations: cross_domain,
            infrastructure_correlations: infrastructure,
            total_correlations: correlations.len(),
            high_value_correlations: high_value,
        };

        Self {
            timestamp,
            correlations,
            analysis_summary,
        }
    }
}

/// Point-in-time context for one metric, built by the RCA context builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricContext {
    pub metric: String,
    /// Raw value string from the instant query; "unknown" on failure
    pub current_value: String,
    /// Short banded interpretation, e.g. "HIGH CPU usage at 92.0% ..."
    pub interpretation: String,
    pub timestamp: DateTime<Utc>,
}

/// Which path produced a narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    /// Live reasoning-service call
    Live,
    /// Deterministic template, no network call
    Template,
}

/// One complete root-cause analysis for a correlation event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaAnalysis {
    pub correlation_event: CorrelationEvent,
    pub metric1_context: MetricContext,
    pub metric2_context: MetricContext,
    pub rca_explanation: String,
    /// True only when the explanation came from a successful live call
    pub reasoning_used: bool,
    pub narrative_source: NarrativeSource,
    pub analysis_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(category: EventCategory, confidence: f64) -> CorrelationEvent {
        CorrelationEvent {
            metric1: "a".into(),
            metric2: "b".into(),
            correlation_coefficient: confidence,
            p_value: 0.001,
            confidence,
            correlation_type: CorrelationType::Positive,
            sample_size: 10,
            category,
            correlation_group: "test".into(),
            business_impact: "HIGH - test".into(),
            statistical_significance: Significance::High,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn significance_bands() {
        assert_eq!(Significance::from_p_value(0.005), Significance::High);
        assert_eq!(Significance::from_p_value(0.03), Significance::Medium);
        assert_eq!(Significance::from_p_value(0.2), Significance::Low);
    }

    #[test]
    fn correlation_type_from_sign() {
        assert_eq!(
            CorrelationType::from_coefficient(0.7),
            CorrelationType::Positive
        );
        assert_eq!(
            CorrelationType::from_coefficient(-0.7),
            CorrelationType::Negative
        );
    }

    #[test]
    fn run_summary_counts() {
        let events = vec![
            sample_event(EventCategory::Business, 0.9),
            sample_event(EventCategory::Business, 0.6),
            sample_event(EventCategory::CrossDomain, 0.7),
            sample_event(EventCategory::Infrastructure, 0.8),
        ];
        let run = AnalysisRun::new(Utc::now(), events);
        assert_eq!(run.analysis_summary.business_correlations, 2);
        assert_eq!(run.analysis_summary.cross_domain_correlations, 1);
        assert_eq!(run.analysis_summary.infrastructure_correlations, 1);
        assert_eq!(run.analysis_summary.total_correlations, 4);
        assert_eq!(run.analysis_summary.high_value_correlations, 1);
    }

    #[test]
    fn impact_severity_prefix() {
        let event = sample_event(EventCategory::Business, 0.9);
        assert_eq!(event.impact_severity(), "HIGH");
    }

    #[test]
    fn event_serializes_type_field() {
        let event = sample_event(EventCategory::Business, 0.9);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "positive");
        assert_eq!(json["category"], "business");
        assert_eq!(json["statistical_significance"], "high");
    }
}
