//! # Corrsight Ingestion
//!
//! Consumption layer for the metrics store.
//!
//! This crate provides:
//! - A thin client over the Prometheus-style HTTP query protocol
//!   (range + instant queries, reachability probe)
//! - The time-series fetcher with its ordered query-rewrite strategies

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod fetch;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::fetch::{RewriteStrategy, SeriesFetcher};
    pub use crate::store::{MetricsStoreClient, MetricsStoreConfig, RangeSeries};
}
