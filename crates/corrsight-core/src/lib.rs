//! # Corrsight Core
//!
//! Shared foundation for the Corrsight correlation and RCA services.
//!
//! This crate provides:
//! - The workspace-wide error type and `Result` alias
//! - Typed configuration for both services
//! - The static metric catalog (categories and verified metric lists)
//! - Domain events (`CorrelationEvent`, `AnalysisRun`, `RcaAnalysis`)
//! - Pure statistics: temporal alignment, Pearson coefficient, p-values

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod stats;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{MetricCatalog, MetricCategory};
    pub use crate::config::{AnalyzerConfig, RcaConfig, TierThresholds};
    pub use crate::events::{
        AnalysisRun, AnalysisSummary, CorrelationEvent, CorrelationType, MetricContext,
        NarrativeSource, RcaAnalysis, Significance,
    };
    pub use crate::stats::{align_series, pairwise_stats, MetricSample, PairStats};
    pub use crate::{Error, Result};
}
