//! # Corrsight Detection
//!
//! The correlation analysis engine:
//! - Tiered pairwise correlation analyzer over the metric catalog
//! - Business impact rule table
//! - Bounded FIFO history of analysis runs
//! - Explicit self-monitoring sink

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod analyzer;
pub mod history;
pub mod impact;
pub mod sink;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analyzer::{CorrelationAnalyzer, SeriesSource};
    pub use crate::history::AnalysisHistory;
    pub use crate::sink::{AnalyzerSink, NoopSink, PrometheusSink};
}
