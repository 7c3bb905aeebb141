//! Time-series fetcher with ordered query-rewrite strategies.
//!
//! A metric name rarely maps to exactly one working query expression:
//! counters need a rate rewrite, ratios are cleaner averaged, and some
//! names work verbatim. The fetcher tries an explicit ordered list of
//! rewrite strategies and stops at the first one that returns data,
//! preserving the rate > raw > average precedence.

use crate::store::{MetricsStoreClient, RangeSeries};
use chrono::{DateTime, Utc};
use corrsight_core::stats::MetricSample;
use std::collections::BTreeMap;
use tracing::debug;

/// One query-rewrite strategy, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStrategy {
    /// `rate(name[1m])` — counter-style metrics only (`*_total`)
    Rate,
    /// The metric name verbatim
    Raw,
    /// `avg(name)` — ratio/percentage-style metrics only
    Average,
}

impl RewriteStrategy {
    /// The fixed precedence order
    pub const ORDER: [RewriteStrategy; 3] = [
        RewriteStrategy::Rate,
        RewriteStrategy::Raw,
        RewriteStrategy::Average,
    ];

    /// Query expression for a metric under this strategy, or `None`
    /// when the strategy does not apply to the metric's name shape.
    pub fn expression(&self, metric: &str) -> Option<String> {
        match self {
            RewriteStrategy::Rate => metric
                .ends_with("_total")
                .then(|| format!("rate({metric}[1m])")),
            RewriteStrategy::Raw => Some(metric.to_string()),
            RewriteStrategy::Average => (metric.contains("ratio") || metric.contains("percent"))
                .then(|| format!("avg({metric})")),
        }
    }
}

/// Fetches one merged time series per metric over a window.
///
/// Query errors are logged and treated as "no data"; the caller sees an
/// empty series on total failure, never an error.
#[derive(Debug, Clone)]
pub struct SeriesFetcher {
    client: MetricsStoreClient,
}

impl SeriesFetcher {
    pub fn new(client: MetricsStoreClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &MetricsStoreClient {
        &self.client
    }

    /// Fetch the series for `metric` over [start, end].
    ///
    /// Tries each rewrite strategy in precedence order; the first
    /// strategy returning at least one non-empty series wins. Label
    /// partitions are merged by summing values at identical timestamps,
    /// ascending.
    pub async fn fetch(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricSample> {
        for strategy in RewriteStrategy::ORDER {
            let Some(expr) = strategy.expression(metric) else {
                continue;
            };

            match self.client.range_query(&expr, start, end).await {
                Ok(series) if !series.is_empty() => {
                    debug!(metric, query = %expr, partitions = series.len(), "fetched series");
                    return merge_partitions(&series);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(metric, query = %expr, error = %e, "range query failed, trying next rewrite");
                }
            }
        }

        debug!(metric, "no data found under any query rewrite");
        Vec::new()
    }
}

/// Merge label partitions into one ascending series, summing values at
/// identical timestamps.
fn merge_partitions(series: &[RangeSeries]) -> Vec<MetricSample> {
    let mut merged: BTreeMap<i64, f64> = BTreeMap::new();
    for partition in series {
        for (ts, value) in &partition.points {
            *merged.entry(*ts).or_insert(0.0) += value;
        }
    }
    merged
        .into_iter()
        .map(|(ts, value)| MetricSample::new(ts, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_rewrite_applies_to_counters_only() {
        assert_eq!(
            RewriteStrategy::Rate.expression("transaction_requests_total"),
            Some("rate(transaction_requests_total[1m])".to_string())
        );
        assert_eq!(
            RewriteStrategy::Rate.expression("redis_cache_hit_ratio"),
            None
        );
    }

    #[test]
    fn average_rewrite_applies_to_ratios_and_percentages() {
        assert_eq!(
            RewriteStrategy::Average.expression("redis_cache_hit_ratio"),
            Some("avg(redis_cache_hit_ratio)".to_string())
        );
        assert_eq!(
            RewriteStrategy::Average.expression("banking_db_pool_utilization_percent"),
            Some("avg(banking_db_pool_utilization_percent)".to_string())
        );
        assert_eq!(
            RewriteStrategy::Average.expression("container_cpu_usage_cores"),
            None
        );
    }

    #[test]
    fn raw_always_applies() {
        assert_eq!(
            RewriteStrategy::Raw.expression("anything_at_all"),
            Some("anything_at_all".to_string())
        );
    }

    #[test]
    fn precedence_is_rate_then_raw_then_average() {
        assert_eq!(
            RewriteStrategy::ORDER,
            [
                RewriteStrategy::Rate,
                RewriteStrategy::Raw,
                RewriteStrategy::Average
            ]
        );
    }

    #[test]
    fn partitions_merge_by_summing_at_identical_timestamps() {
        let series = vec![
            RangeSeries {
                points: vec![(100, 1.0), (200, 2.0), (300, 3.0)],
            },
            RangeSeries {
                points: vec![(200, 10.0), (300, 20.0), (400, 30.0)],
            },
        ];
        let merged = merge_partitions(&series);
        assert_eq!(
            merged,
            vec![
                MetricSample::new(100, 1.0),
                MetricSample::new(200, 12.0),
                MetricSample::new(300, 23.0),
                MetricSample::new(400, 30.0),
            ]
        );
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(merge_partitions(&[]).is_empty());
    }
}
