//! Static metric catalog.
//!
//! The catalog is the registry of monitored metric names grouped into
//! categories. It is an explicit value handed to the analyzer at
//! construction so that tier fan-out, category lookups, and the /config
//! surface all read from the same source of truth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category a monitored metric belongs to.
///
/// The first five categories are "business" categories; `Infrastructure`
/// is the only non-business one and is analyzed under stricter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Transaction,
    Database,
    Cache,
    MessageQueue,
    Security,
    Infrastructure,
}

impl MetricCategory {
    /// All categories in fixed declaration order
    pub const ALL: [MetricCategory; 6] = [
        MetricCategory::Transaction,
        MetricCategory::Database,
        MetricCategory::Cache,
        MetricCategory::MessageQueue,
        MetricCategory::Security,
        MetricCategory::Infrastructure,
    ];

    /// Business categories in fixed declaration order
    pub const BUSINESS: [MetricCategory; 5] = [
        MetricCategory::Transaction,
        MetricCategory::Database,
        MetricCategory::Cache,
        MetricCategory::MessageQueue,
        MetricCategory::Security,
    ];

    /// Whether this category counts as a business category
    pub fn is_business(&self) -> bool {
        !matches!(self, MetricCategory::Infrastructure)
    }

    /// Stable snake_case name used in correlation groups and API output
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Transaction => "transaction",
            MetricCategory::Database => "database",
            MetricCategory::Cache => "cache",
            MetricCategory::MessageQueue => "message_queue",
            MetricCategory::Security => "security",
            MetricCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry of monitored metric names grouped by category.
///
/// Group order and metric order within a group are fixed, which makes
/// tier fan-out deterministic: identical catalogs produce identical pair
/// evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCatalog {
    groups: Vec<(MetricCategory, Vec<String>)>,
}

impl MetricCatalog {
    /// Build a catalog from explicit groups.
    ///
    /// Groups are stored in the order given; duplicate categories are
    /// merged in first-seen position.
    pub fn new(groups: Vec<(MetricCategory, Vec<String>)>) -> Self {
        let mut merged: Vec<(MetricCategory, Vec<String>)> = Vec::new();
        for (category, metrics) in groups {
            if let Some(existing) = merged.iter_mut().find(|(c, _)| *c == category) {
                existing.1.extend(metrics);
            } else {
                merged.push((category, metrics));
            }
        }
        Self { groups: merged }
    }

    /// Metrics for one category (empty slice if absent)
    pub fn metrics(&self, category: MetricCategory) -> &[String] {
        self.groups
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, m)| m.as_slice())
            .unwrap_or(&[])
    }

    /// Business groups in fixed declaration order
    pub fn business_groups(&self) -> impl Iterator<Item = (MetricCategory, &[String])> {
        self.groups
            .iter()
            .filter(|(c, _)| c.is_business())
            .map(|(c, m)| (*c, m.as_slice()))
    }

    /// Infrastructure metric list
    pub fn infrastructure(&self) -> &[String] {
        self.metrics(MetricCategory::Infrastructure)
    }

    /// Category of a metric name, if it is in the catalog
    pub fn category_of(&self, name: &str) -> Option<MetricCategory> {
        self.groups
            .iter()
            .find(|(_, metrics)| metrics.iter().any(|m| m == name))
            .map(|(c, _)| *c)
    }

    /// Number of metrics per category, for /health and /config
    pub fn group_sizes(&self) -> BTreeMap<String, usize> {
        self.groups
            .iter()
            .map(|(c, m)| (format!("{}_metrics", c.as_str()), m.len()))
            .collect()
    }

    /// Total number of monitored metrics
    pub fn total_metrics(&self) -> usize {
        self.groups.iter().map(|(_, m)| m.len()).sum()
    }
}

impl Default for MetricCatalog {
    /// The verified production metric set, organized by business value.
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }

        Self::new(vec![
            (
                MetricCategory::Transaction,
                owned(&[
                    "transaction_requests_total",
                    "transaction_failures_total",
                    "transaction_duration_seconds_bucket",
                    "transaction_avg_response_time",
                    "slow_transaction_percentage",
                    "transaction_anomaly_score",
                    "business_hour_transaction_rate",
                    "off_hour_transaction_rate",
                    "slo_compliance_percentage",
                    "transaction_performance_score",
                ]),
            ),
            (
                MetricCategory::Database,
                owned(&[
                    "banking_db_pool_utilization_percent",
                    "banking_db_pool_connections_active",
                    "banking_db_pool_connections_idle",
                    "banking_db_queries_total",
                    "banking_db_query_duration_seconds_bucket",
                    "pg_stat_activity_count",
                    "banking_db_pool_size",
                ]),
            ),
            (
                MetricCategory::Cache,
                owned(&[
                    "banking_cache_hits_total",
                    "banking_cache_misses_total",
                    "redis_cache_hit_ratio",
                    "redis_cache_efficiency_score",
                    "redis_memory_used_bytes",
                    "redis_connected_clients",
                    "banking_cache_active_entries",
                    "redis_cache_eviction_rate",
                ]),
            ),
            (
                MetricCategory::MessageQueue,
                owned(&[
                    "banking_messages_published_total",
                    "banking_messages_consumed_total",
                    "banking_unprocessed_messages",
                    "banking_queue_consumer_lag",
                    "rabbitmq_queue_messages_ready",
                    "rabbitmq_queue_messages_total",
                ]),
            ),
            (
                MetricCategory::Security,
                owned(&[
                    "ddos_detection_score",
                    "ddos_binary_prediction",
                    "ddos_confidence",
                    "ddos_model_predictions_total",
                    "detection_latency_seconds",
                ]),
            ),
            (
                MetricCategory::Infrastructure,
                owned(&[
                    "container_cpu_usage_cores",
                    "container_memory_usage_mb",
                    "container_cpu_usage_percent",
                    "container_memory_usage_percent",
                    "container_network_rx_mb",
                    "container_network_tx_mb",
                ]),
            ),
        ])
    }
}
