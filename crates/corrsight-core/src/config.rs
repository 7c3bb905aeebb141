//! Typed configuration for both Corrsight services.
//!
//! Defaults match the deployed system. The binary fills these from CLI
//! flags and environment variables; validation happens once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Acceptance thresholds for one priority tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum |r| required for acceptance
    pub min_coefficient: f64,
    /// Maximum two-sided p-value allowed for acceptance
    pub max_p_value: f64,
}

impl TierThresholds {
    /// Tier 1: business-to-business. Lenient — business correlations are
    /// valuable even when moderate.
    pub const BUSINESS: TierThresholds = TierThresholds {
        min_coefficient: 0.5,
        max_p_value: 0.10,
    };

    /// Tier 2: infrastructure-to-business
    pub const CROSS_DOMAIN: TierThresholds = TierThresholds {
        min_coefficient: 0.6,
        max_p_value: 0.05,
    };

    /// Tier 3: infrastructure-to-infrastructure
    pub const INFRASTRUCTURE: TierThresholds = TierThresholds {
        min_coefficient: 0.7,
        max_p_value: 0.05,
    };

    /// Whether a computed (r, p) pair passes this tier.
    /// Both conditions are required.
    pub fn accepts(&self, coefficient: f64, p_value: f64) -> bool {
        coefficient.abs() > self.min_coefficient && p_value < self.max_p_value
    }
}

/// Configuration for the correlation analyzer service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Metrics store base URL (e.g. "http://prometheus:9090")
    pub metrics_store_url: String,
    /// Seconds between analysis ticks
    pub analysis_interval_secs: u64,
    /// Backoff after a failed tick (seconds)
    pub error_backoff_secs: u64,
    /// Lookback window per tick (minutes)
    pub lookback_minutes: i64,
    /// Range-query step (seconds)
    pub step_secs: u64,
    /// Range-query deadline (seconds)
    pub range_timeout_secs: u64,
    /// Instant-query and reachability-probe deadline (seconds)
    pub instant_timeout_secs: u64,
    /// Minimum aligned samples per pair
    pub min_samples: usize,
    /// Tier 1 runs over this many metrics per business group
    pub business_fanout: usize,
    /// Tier 2: leading infrastructure metrics considered
    pub cross_domain_infra_fanout: usize,
    /// Tier 2: leading metrics per business group
    pub cross_domain_business_fanout: usize,
    /// Tier 3 runs only when Tier 1 accepted fewer events than this
    pub infra_tier_trigger: usize,
    /// Tier 3: leading infrastructure metrics considered
    pub infra_fanout: usize,
    /// Tier 3: each metric is paired with this many following metrics
    pub infra_pair_span: usize,
    /// History ring-buffer capacity
    pub history_capacity: usize,
    /// API bind address
    pub bind_addr: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            metrics_store_url: "http://prometheus:9090".to_string(),
            analysis_interval_secs: 60,
            error_backoff_secs: 30,
            lookback_minutes: 15,
            step_secs: 60,
            range_timeout_secs: 10,
            instant_timeout_secs: 5,
            min_samples: 5,
            business_fanout: 3,
            cross_domain_infra_fanout: 5,
            cross_domain_business_fanout: 2,
            infra_tier_trigger: 5,
            infra_fanout: 8,
            infra_pair_span: 3,
            history_capacity: 100,
            bind_addr: "0.0.0.0:5025".to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Validate invariants that would otherwise surface as confusing
    /// runtime behavior.
    pub fn validate(&self) -> Result<()> {
        if self.analysis_interval_secs == 0 {
            return Err(Error::config("analysis_interval_secs must be greater than 0"));
        }
        if self.lookback_minutes <= 0 {
            return Err(Error::config("lookback_minutes must be positive"));
        }
        if self.min_samples < 2 {
            return Err(Error::config("min_samples must be at least 2"));
        }
        if self.history_capacity == 0 {
            return Err(Error::config("history_capacity must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration for the RCA narrative service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaConfig {
    /// Correlation service base URL
    pub correlation_engine_url: String,
    /// Metrics store base URL (instant queries for metric context)
    pub metrics_store_url: String,
    /// Reasoning service base URL
    pub reasoning_endpoint: String,
    /// Reasoning model identifier
    pub reasoning_model: String,
    /// Bearer credential; empty means unconfigured
    pub reasoning_api_key: String,
    /// Reasoning request deadline (seconds)
    pub reasoning_timeout_secs: u64,
    /// Max output tokens per narrative
    pub max_output_tokens: u32,
    /// Sampling temperature for narratives
    pub temperature: f64,
    /// Instant-query and reachability-probe deadline (seconds)
    pub instant_timeout_secs: u64,
    /// Default lower confidence bound for /analyze
    pub default_min_confidence: f64,
    /// Default upper confidence bound for /analyze
    pub default_max_confidence: f64,
    /// API bind address
    pub bind_addr: String,
}

impl Default for RcaConfig {
    fn default() -> Self {
        Self {
            correlation_engine_url: "http://event-correlation-engine:5025".to_string(),
            metrics_store_url: "http://prometheus:9090".to_string(),
            reasoning_endpoint: "https://api.openai.com".to_string(),
            reasoning_model: "gpt-4o".to_string(),
            reasoning_api_key: String::new(),
            reasoning_timeout_secs: 30,
            max_output_tokens: 800,
            temperature: 0.3,
            instant_timeout_secs: 5,
            default_min_confidence: 0.7,
            default_max_confidence: 0.95,
            bind_addr: "0.0.0.0:5026".to_string(),
        }
    }
}

impl RcaConfig {
    /// Expected credential prefix for the reasoning service
    pub const CREDENTIAL_PREFIX: &'static str = "sk-";

    /// Whether a credential was provided at all
    pub fn credential_provided(&self) -> bool {
        !self.reasoning_api_key.is_empty()
    }

    /// Whether the provided credential has the expected format.
    /// A malformed credential is a ConfigurationError surfaced through
    /// /health and /status; the service still runs in fallback mode.
    pub fn credential_format_valid(&self) -> bool {
        self.reasoning_api_key.starts_with(Self::CREDENTIAL_PREFIX)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_min_confidence) {
            return Err(Error::config("default_min_confidence must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.default_max_confidence) {
            return Err(Error::config("default_max_confidence must be in [0, 1]"));
        }
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(Error::config("temperature must be in [0, 2]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_require_both_conditions() {
        let tier = TierThresholds::CROSS_DOMAIN;
        assert!(tier.accepts(0.9, 0.01));
        assert!(tier.accepts(-0.9, 0.01));
        // Strong coefficient, weak significance
        assert!(!tier.accepts(0.9, 0.2));
        // Strong significance, weak coefficient
        assert!(!tier.accepts(0.3, 0.001));
        // Boundary values are exclusive
        assert!(!tier.accepts(0.6, 0.01));
        assert!(!tier.accepts(0.9, 0.05));
    }

    #[test]
    fn default_analyzer_config_is_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = AnalyzerConfig::default();
        config.analysis_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credential_format() {
        let mut config = RcaConfig::default();
        assert!(!config.credential_provided());
        config.reasoning_api_key = "sk-abc123".to_string();
        assert!(config.credential_provided());
        assert!(config.credential_format_valid());
        config.reasoning_api_key = "bogus".to_string();
        assert!(!config.credential_format_valid());
    }
}
