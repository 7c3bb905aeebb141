//! Dual-path narrative generation.
//!
//! The generator is configured exactly once at startup: a credential
//! check plus one tiny self-test call fix the dispatch path for the
//! life of the process. The live path calls the reasoning service per
//! event; the template path renders a deterministic narrative from the
//! event and its metric contexts with no network traffic.
//!
//! Live-path failures are not uniform: credential and quota errors are
//! surfaced verbatim as "Error: ..." explanation text so operators see
//! them, while transient failures quietly degrade to the template.

use crate::context::ContextBuilder;
use crate::reasoning::{ReasoningBackend, ReasoningClient};
use chrono::Utc;
use corrsight_core::config::RcaConfig;
use corrsight_core::events::{CorrelationEvent, MetricContext, NarrativeSource, RcaAnalysis};
use corrsight_core::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fixed system prompt for every live narrative call
const SYSTEM_PROMPT: &str = "You are a site reliability expert analyzing a banking \
microservices platform. You receive correlation reports between monitored metrics \
and respond with a concise root-cause analysis structured as four sections: Root \
Cause Analysis, Business Impact Assessment, Specific Remediation Steps, and \
Prevention Recommendations. Be specific to the metrics given; do not invent \
metrics that are not in the report.";

/// Reasoning-service readiness, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningStatus {
    /// No credential, or a credential with the wrong format
    NotConfigured,
    /// Self-test passed (or was rate-limited); live dispatch
    TestedOk,
    /// Self-test failed; template dispatch
    TestedFailed,
}

impl ReasoningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningStatus::NotConfigured => "not_configured",
            ReasoningStatus::TestedOk => "configured_and_tested",
            ReasoningStatus::TestedFailed => "configured_but_failed_test",
        }
    }

    /// Operator-facing summary plus remediation hints for /status
    pub fn message_and_hints(&self, config: &RcaConfig) -> (&'static str, Vec<&'static str>) {
        match self {
            ReasoningStatus::NotConfigured if !config.credential_provided() => (
                "No reasoning service credential provided",
                vec![
                    "Set the reasoning API key in the environment",
                    "Restart the RCA service",
                ],
            ),
            ReasoningStatus::NotConfigured => (
                "Reasoning service credential has an invalid format",
                vec![
                    "Check the credential format (expected prefix: sk-)",
                    "Ensure no extra spaces or characters",
                ],
            ),
            ReasoningStatus::TestedFailed => (
                "Reasoning service self-test failed",
                vec![
                    "Verify credential permissions",
                    "Check reasoning service status",
                    "Review service logs",
                ],
            ),
            ReasoningStatus::TestedOk => (
                "Reasoning service is configured and tested",
                vec!["System ready for live narrative generation"],
            ),
        }
    }
}

/// The dispatch path, chosen once
#[derive(Debug)]
enum Dispatch {
    Live(Arc<dyn ReasoningBackend>),
    Template,
}

/// Generates one narrative per correlation event
#[derive(Debug)]
pub struct NarrativeGenerator {
    dispatch: Dispatch,
    status: ReasoningStatus,
}

impl NarrativeGenerator {
    /// Check the credential and run the one-time self-test.
    ///
    /// Never fails: every startup problem degrades to the template path
    /// and is reported through `status()`.
    pub async fn initialize(config: &RcaConfig) -> Self {
        if !config.credential_provided() {
            warn!("no reasoning service credential provided, using template narratives");
            return Self {
                dispatch: Dispatch::Template,
                status: ReasoningStatus::NotConfigured,
            };
        }

        if !config.credential_format_valid() {
            error!(
                expected_prefix = RcaConfig::CREDENTIAL_PREFIX,
                "reasoning service credential has an invalid format"
            );
            metrics::counter!("reasoning_errors_total", "error_type" => "invalid_key_format")
                .increment(1);
            return Self {
                dispatch: Dispatch::Template,
                status: ReasoningStatus::NotConfigured,
            };
        }

        let client = ReasoningClient::from_config(config);
        match client.self_test().await {
            Ok(()) => {
                info!(model = client.model(), "reasoning service self-test passed");
                Self {
                    dispatch: Dispatch::Live(Arc::new(client)),
                    status: ReasoningStatus::TestedOk,
                }
            }
            // A rate limit proves the credential works
            Err(Error::ReasoningQuota(msg)) => {
                warn!(%msg, "reasoning service rate-limited during self-test, treating as passed");
                Self {
                    dispatch: Dispatch::Live(Arc::new(client)),
                    status: ReasoningStatus::TestedOk,
                }
            }
            Err(e) => {
                error!(error = %e, "reasoning service self-test failed, using template narratives");
                Self {
                    dispatch: Dispatch::Template,
                    status: ReasoningStatus::TestedFailed,
                }
            }
        }
    }

    pub fn status(&self) -> ReasoningStatus {
        self.status
    }

    /// Whether per-event generation goes over the network
    pub fn is_live(&self) -> bool {
        matches!(self.dispatch, Dispatch::Live(_))
    }

    /// Generate the explanation text for one event.
    pub async fn generate(
        &self,
        event: &CorrelationEvent,
        ctx1: &MetricContext,
        ctx2: &MetricContext,
    ) -> (String, NarrativeSource) {
        let backend = match &self.dispatch {
            Dispatch::Template => {
                return (
                    template_narrative(event, ctx1, ctx2),
                    NarrativeSource::Template,
                )
            }
            Dispatch::Live(backend) => backend,
        };

        let prompt = build_prompt(event, ctx1, ctx2);
        match backend.narrative(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => (text, NarrativeSource::Live),
            Err(e) => match failure_text(&e) {
                Some(text) => {
                    error!(error = %e, "reasoning call failed with a non-degradable error");
                    (text, NarrativeSource::Template)
                }
                None => {
                    warn!(error = %e, "reasoning call failed, degrading to template narrative");
                    (
                        template_narrative(event, ctx1, ctx2),
                        NarrativeSource::Template,
                    )
                }
            },
        }
    }
}

/// Errors that must be shown to the operator instead of being papered
/// over with a template. Returns the explanation text to surface, or
/// `None` when degrading to the template is the right move.
fn failure_text(error: &Error) -> Option<String> {
    match error {
        Error::ReasoningAuth(_) => Some(
            "Error: reasoning service authentication failed - check the configured credential"
                .to_string(),
        ),
        Error::ReasoningQuota(_) => Some(
            "Error: reasoning service rate limit exceeded - try again later".to_string(),
        ),
        Error::Reasoning(_) => Some("Error: reasoning service returned an empty response".to_string()),
        _ => None,
    }
}

/// Structured correlation report handed to the reasoning service
pub fn build_prompt(
    event: &CorrelationEvent,
    ctx1: &MetricContext,
    ctx2: &MetricContext,
) -> String {
    let display1 = display_value(&ctx1.metric, &ctx1.current_value);
    let display2 = display_value(&ctx2.metric, &ctx2.current_value);

    format!(
        "\
CORRELATION ANALYSIS REPORT
===========================

Correlation Detected: {ctype} correlation (confidence: {confidence:.2})

METRIC ANALYSIS:
Primary Metric: {display1}
- Context: {interp1}
- Description: {desc1}

Secondary Metric: {display2}
- Context: {interp2}
- Description: {desc2}

CORRELATION DETAILS:
- Correlation coefficient: {coefficient:.3}
- Statistical significance: p-value = {p_value:.4}
- Sample size: {samples} data points

BUSINESS CONTEXT:
This correlation was detected in our banking microservices monitoring system. The metrics represent:
- {m1}: {biz1}
- {m2}: {biz2}

ANALYSIS REQUEST:
Based on this correlation between {display1} and {display2}, provide:
1. **Root Cause Analysis:** Why are these metrics correlated?
2. **Business Impact Assessment:** How does this affect banking operations?
3. **Specific Remediation Steps:** Immediate actions to take
4. **Prevention Recommendations:** Long-term measures to prevent issues
",
        ctype = event.correlation_type.as_str().to_uppercase(),
        confidence = event.confidence,
        interp1 = ctx1.interpretation,
        desc1 = describe_metric(&ctx1.metric),
        interp2 = ctx2.interpretation,
        desc2 = describe_metric(&ctx2.metric),
        coefficient = event.correlation_coefficient,
        p_value = event.p_value,
        samples = event.sample_size,
        m1 = ctx1.metric,
        biz1 = business_context(&ctx1.metric),
        m2 = ctx2.metric,
        biz2 = business_context(&ctx2.metric),
    )
}

/// Deterministic fallback narrative, tagged as template-based
pub fn template_narrative(
    event: &CorrelationEvent,
    ctx1: &MetricContext,
    ctx2: &MetricContext,
) -> String {
    format!(
        "\
ROOT CAUSE ANALYSIS (template narrative - reasoning service not used)
=====================================================================

CORRELATION SUMMARY:
A {ctype} correlation (confidence: {confidence:.2}) was detected between:
- {m1}: {interp1}
- {m2}: {interp2}

LIKELY ROOT CAUSE:
Resource contention or cascading performance impact between related system components.

BUSINESS IMPACT:
- Potential customer experience degradation
- Risk of service performance issues
- Possible transaction processing delays

RECOMMENDED ACTIONS:
1. Monitor both metrics closely for continued correlation
2. Check resource allocation for affected services
3. Review recent deployments or configuration changes
4. Scale resources if performance thresholds are exceeded

PREVENTION:
- Implement proactive monitoring alerts
- Review service resource limits
- Consider implementing circuit breakers
- Schedule regular performance reviews

Note: configure a valid reasoning service credential for live analysis.
",
        ctype = event.correlation_type.as_str(),
        confidence = event.confidence,
        m1 = ctx1.metric,
        interp1 = ctx1.interpretation,
        m2 = ctx2.metric,
        interp2 = ctx2.interpretation,
    )
}

/// Metric value with a unit suffix where the name family implies one
fn display_value(metric: &str, value: &str) -> String {
    if value == "unknown" {
        return format!("{metric}: {value}");
    }
    let Ok(parsed) = value.parse::<f64>() else {
        return format!("{metric}: {value}");
    };

    if metric.contains("memory_usage_mb") {
        format!("{metric}: {parsed:.1} MB")
    } else if metric.contains("cpu_usage_percent") {
        format!("{metric}: {parsed:.1}%")
    } else if metric.contains("cache_hit_ratio") {
        format!("{metric}: {:.1}%", parsed * 100.0)
    } else {
        format!("{metric}: {value}")
    }
}

/// "transaction_requests_total" -> "Transaction Requests Total"
fn describe_metric(metric: &str) -> String {
    metric
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short business description per metric name family
fn business_context(metric: &str) -> &'static str {
    if metric.contains("transaction") {
        "Banking transaction processing performance and volume"
    } else if metric.contains("memory_usage") {
        "Container memory consumption affecting service performance"
    } else if metric.contains("cpu_usage") {
        "Container CPU utilization impacting processing capacity"
    } else if metric.contains("cache_hit_ratio") {
        "Redis cache efficiency affecting response times"
    } else if metric.contains("db_") {
        "Database performance and connection utilization"
    } else if metric.contains("ddos") {
        "DDoS detection and security threat assessment"
    } else if metric.contains("messages") {
        "Message queue processing and workflow coordination"
    } else if metric.contains("response_time") || metric.contains("duration") {
        "Service response time and user experience"
    } else {
        "System monitoring metric"
    }
}

/// Full per-event pipeline: both contexts, then the narrative
#[derive(Debug)]
pub struct RcaPipeline {
    contexts: ContextBuilder,
    generator: NarrativeGenerator,
}

impl RcaPipeline {
    pub fn new(contexts: ContextBuilder, generator: NarrativeGenerator) -> Self {
        Self {
            contexts,
            generator,
        }
    }

    pub fn generator(&self) -> &NarrativeGenerator {
        &self.generator
    }

    pub fn contexts(&self) -> &ContextBuilder {
        &self.contexts
    }

    /// Analyze one correlation event end to end
    pub async fn analyze_event(&self, event: CorrelationEvent) -> RcaAnalysis {
        let started = std::time::Instant::now();

        let metric1_context = self.contexts.build(&event.metric1).await;
        let metric2_context = self.contexts.build(&event.metric2).await;

        let (rca_explanation, narrative_source) = self
            .generator
            .generate(&event, &metric1_context, &metric2_context)
            .await;

        metrics::counter!("rca_narratives_total", "source" => narrative_source_label(narrative_source))
            .increment(1);

        let analysis_time_seconds = started.elapsed().as_secs_f64();
        metrics::histogram!("rca_analysis_duration_seconds").record(analysis_time_seconds);
        info!(
            metric1 = %event.metric1,
            metric2 = %event.metric2,
            source = narrative_source_label(narrative_source),
            elapsed_secs = analysis_time_seconds,
            "narrative generated"
        );

        RcaAnalysis {
            correlation_event: event,
            metric1_context,
            metric2_context,
            rca_explanation,
            reasoning_used: narrative_source == NarrativeSource::Live,
            narrative_source,
            analysis_time_seconds,
            timestamp: Utc::now(),
        }
    }
}

fn narrative_source_label(source: NarrativeSource) -> &'static str {
    match source {
        NarrativeSource::Live => "live",
        NarrativeSource::Template => "template",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use corrsight_core::events::{CorrelationType, EventCategory, Significance};
    use corrsight_core::Result;

    /// Backend that rejects any prompt mentioning a blocked metric and
    /// answers everything else
    #[derive(Debug)]
    struct ScriptedBackend {
        blocked_metric: &'static str,
        failure: fn() -> Error,
    }

    #[async_trait]
    impl ReasoningBackend for ScriptedBackend {
        async fn narrative(&self, _system: &str, user: &str) -> Result<String> {
            if user.contains(self.blocked_metric) {
                Err((self.failure)())
            } else {
                Ok("Live root-cause narrative".to_string())
            }
        }
    }

    fn live_generator(backend: ScriptedBackend) -> NarrativeGenerator {
        NarrativeGenerator {
            dispatch: Dispatch::Live(Arc::new(backend)),
            status: ReasoningStatus::TestedOk,
        }
    }

    fn sample_event() -> CorrelationEvent {
        CorrelationEvent {
            metric1: "container_cpu_usage_percent".to_string(),
            metric2: "transaction_avg_response_time".to_string(),
            correlation_coefficient: 0.874,
            p_value: 0.0123,
            confidence: 0.874,
            correlation_type: CorrelationType::Positive,
            sample_size: 12,
            category: EventCategory::CrossDomain,
            correlation_group: "infrastructure_to_transaction".to_string(),
            business_impact: "LOW - Infrastructure correlation with transaction".to_string(),
            statistical_significance: Significance::Medium,
            timestamp: Utc::now(),
        }
    }

    fn context(metric: &str, value: &str, interpretation: &str) -> MetricContext {
        MetricContext {
            metric: metric.to_string(),
            current_value: value.to_string(),
            interpretation: interpretation.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn prompt_contains_event_details() {
        let event = sample_event();
        let ctx1 = context(
            "container_cpu_usage_percent",
            "0.92",
            "HIGH CPU usage at 92.0% (Critical: >80%)",
        );
        let ctx2 = context(
            "transaction_avg_response_time",
            "1.2",
            "DEGRADED response time at 1.20s",
        );

        let prompt = build_prompt(&event, &ctx1, &ctx2);
        assert!(prompt.contains("POSITIVE correlation (confidence: 0.87)"));
        assert!(prompt.contains("container_cpu_usage_percent: 0.9%"));
        assert!(prompt.contains("Correlation coefficient: 0.874"));
        assert!(prompt.contains("p-value = 0.0123"));
        assert!(prompt.contains("Sample size: 12 data points"));
        assert!(prompt.contains("Container CPU utilization impacting processing capacity"));
        assert!(prompt.contains("Service response time and user experience"));
        assert!(prompt.contains("**Root Cause Analysis:**"));
    }

    #[test]
    fn display_values_carry_units() {
        assert_eq!(
            display_value("container_memory_usage_mb", "512.37"),
            "container_memory_usage_mb: 512.4 MB"
        );
        assert_eq!(
            display_value("container_cpu_usage_percent", "72.5"),
            "container_cpu_usage_percent: 72.5%"
        );
        assert_eq!(
            display_value("redis_cache_hit_ratio", "0.85"),
            "redis_cache_hit_ratio: 85.0%"
        );
        assert_eq!(
            display_value("banking_db_pool_size", "20"),
            "banking_db_pool_size: 20"
        );
        assert_eq!(
            display_value("container_memory_usage_mb", "unknown"),
            "container_memory_usage_mb: unknown"
        );
    }

    #[test]
    fn metric_descriptions_are_title_cased() {
        assert_eq!(
            describe_metric("transaction_requests_total"),
            "Transaction Requests Total"
        );
    }

    #[test]
    fn template_narrative_is_tagged_and_deterministic() {
        let event = sample_event();
        let ctx1 = context("a_metric", "1", "Current value: 1");
        let ctx2 = context("b_metric", "2", "Current value: 2");

        let first = template_narrative(&event, &ctx1, &ctx2);
        let second = template_narrative(&event, &ctx1, &ctx2);
        assert_eq!(first, second);
        assert!(first.contains("template narrative"));
        assert!(first.contains("positive correlation (confidence: 0.87)"));
        assert!(first.contains("a_metric: Current value: 1"));
    }

    #[test]
    fn auth_and_quota_failures_surface_as_error_text() {
        let auth = failure_text(&Error::ReasoningAuth("HTTP 401".to_string())).unwrap();
        assert!(auth.starts_with("Error: reasoning service authentication failed"));

        let quota = failure_text(&Error::ReasoningQuota("HTTP 429".to_string())).unwrap();
        assert!(quota.starts_with("Error: reasoning service rate limit exceeded"));

        let empty = failure_text(&Error::Reasoning("empty response".to_string())).unwrap();
        assert!(empty.contains("empty response"));
    }

    #[test]
    fn transient_failures_degrade_to_template() {
        assert!(failure_text(&Error::dependency("connection refused")).is_none());
        assert!(failure_text(&Error::protocol("bad json")).is_none());
    }

    #[tokio::test]
    async fn missing_credential_yields_template_dispatch() {
        let config = RcaConfig::default();
        let generator = NarrativeGenerator::initialize(&config).await;
        assert_eq!(generator.status(), ReasoningStatus::NotConfigured);
        assert!(!generator.is_live());
    }

    #[tokio::test]
    async fn malformed_credential_yields_template_dispatch() {
        let mut config = RcaConfig::default();
        config.reasoning_api_key = "not-a-valid-key".to_string();
        let generator = NarrativeGenerator::initialize(&config).await;
        assert_eq!(generator.status(), ReasoningStatus::NotConfigured);
        assert!(!generator.is_live());
    }

    #[tokio::test]
    async fn template_dispatch_generates_without_network() {
        let generator = NarrativeGenerator::initialize(&RcaConfig::default()).await;
        let event = sample_event();
        let ctx1 = context("a_metric", "1", "Current value: 1");
        let ctx2 = context("b_metric", "2", "Current value: 2");

        let (text, source) = generator.generate(&event, &ctx1, &ctx2).await;
        assert_eq!(source, NarrativeSource::Template);
        assert!(text.contains("template narrative"));
    }

    fn event_between(metric1: &str, metric2: &str) -> CorrelationEvent {
        let mut event = sample_event();
        event.metric1 = metric1.to_string();
        event.metric2 = metric2.to_string();
        event
    }

    #[tokio::test]
    async fn auth_failure_surfaces_per_event_without_poisoning_the_batch() {
        let generator = live_generator(ScriptedBackend {
            blocked_metric: "banking_db_pool_utilization_percent",
            failure: || Error::ReasoningAuth("HTTP 401".to_string()),
        });

        let batch = [
            event_between("transaction_requests_total", "redis_cache_hit_ratio"),
            event_between("banking_db_pool_utilization_percent", "container_cpu_usage_percent"),
            event_between("banking_messages_published_total", "transaction_failures_total"),
        ];

        let mut results = Vec::new();
        for event in &batch {
            let ctx1 = context(&event.metric1, "1.0", "Current value: 1.0");
            let ctx2 = context(&event.metric2, "2.0", "Current value: 2.0");
            results.push(generator.generate(event, &ctx1, &ctx2).await);
        }

        assert_eq!(results[0].1, NarrativeSource::Live);
        assert_eq!(results[0].0, "Live root-cause narrative");

        assert_eq!(results[1].1, NarrativeSource::Template);
        assert!(results[1]
            .0
            .starts_with("Error: reasoning service authentication failed"));

        assert_eq!(results[2].1, NarrativeSource::Live);
        assert_eq!(results[2].0, "Live root-cause narrative");
    }

    #[tokio::test]
    async fn transient_live_failure_degrades_that_event_to_template() {
        let generator = live_generator(ScriptedBackend {
            blocked_metric: "banking_db_pool_utilization_percent",
            failure: || Error::dependency("connection reset"),
        });

        let event = event_between(
            "banking_db_pool_utilization_percent",
            "container_cpu_usage_percent",
        );
        let ctx1 = context(&event.metric1, "1.0", "Current value: 1.0");
        let ctx2 = context(&event.metric2, "2.0", "Current value: 2.0");

        let (text, source) = generator.generate(&event, &ctx1, &ctx2).await;
        assert_eq!(source, NarrativeSource::Template);
        assert!(text.contains("template narrative"));
        assert!(!text.starts_with("Error:"));
    }

    #[test]
    fn status_strings_match_reporting_contract() {
        assert_eq!(ReasoningStatus::NotConfigured.as_str(), "not_configured");
        assert_eq!(ReasoningStatus::TestedOk.as_str(), "configured_and_tested");
        assert_eq!(
            ReasoningStatus::TestedFailed.as_str(),
            "configured_but_failed_test"
        );
    }

    #[test]
    fn status_hints_distinguish_missing_and_malformed() {
        let config = RcaConfig::default();
        let (message, _) = ReasoningStatus::NotConfigured.message_and_hints(&config);
        assert!(message.contains("No reasoning service credential"));

        let mut config = RcaConfig::default();
        config.reasoning_api_key = "bogus".to_string();
        let (message, hints) = ReasoningStatus::NotConfigured.message_and_hints(&config);
        assert!(message.contains("invalid format"));
        assert!(hints.iter().any(|h| h.contains("sk-")));
    }
}
