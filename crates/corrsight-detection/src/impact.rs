//! Business impact rule table.
//!
//! Maps the categories of a correlated metric pair plus the correlation
//! strength to a coarse, severity-prefixed impact string. The prefix
//! ("CRITICAL", "HIGH", "MEDIUM", "LOW") is what the summary endpoint
//! aggregates on; the rest is operator-facing text.

use corrsight_core::catalog::MetricCategory;

/// Category pairs whose correlation directly affects core operations
const HIGH_VALUE_PAIRS: [(MetricCategory, MetricCategory); 6] = [
    (MetricCategory::Transaction, MetricCategory::Database),
    (MetricCategory::Transaction, MetricCategory::Cache),
    (MetricCategory::Transaction, MetricCategory::Security),
    (MetricCategory::Database, MetricCategory::Cache),
    (MetricCategory::Security, MetricCategory::Transaction),
    (MetricCategory::MessageQueue, MetricCategory::Transaction),
];

/// Assess the business impact of a correlation between two categorized
/// metrics with coefficient `r`.
pub fn assess_business_impact(cat1: MetricCategory, cat2: MetricCategory, r: f64) -> String {
    let strength = r.abs();

    let is_high_value = HIGH_VALUE_PAIRS
        .iter()
        .any(|(a, b)| (*a == cat1 && *b == cat2) || (*a == cat2 && *b == cat1));

    if is_high_value {
        if strength > 0.8 {
            format!(
                "CRITICAL - Strong {cat1}<->{cat2} correlation affects core banking operations"
            )
        } else if strength > 0.6 {
            format!(
                "HIGH - Significant {cat1}<->{cat2} correlation impacts business performance"
            )
        } else {
            format!("MEDIUM - Moderate {cat1}<->{cat2} correlation, monitor for trends")
        }
    } else if cat1 == cat2 && cat1.is_business() {
        format!("MEDIUM - Internal {cat1} correlation may indicate bottlenecks")
    } else if cat1 == MetricCategory::Infrastructure && cat2 == MetricCategory::Infrastructure {
        "LOW - General infrastructure correlation".to_string()
    } else if cat1 == MetricCategory::Infrastructure || cat2 == MetricCategory::Infrastructure {
        let other = if cat1 == MetricCategory::Infrastructure {
            cat2
        } else {
            cat1
        };
        format!("LOW - Infrastructure correlation with {other}")
    } else {
        format!("MEDIUM - Moderate {cat1}<->{cat2} correlation, monitor for trends")
    }
}
