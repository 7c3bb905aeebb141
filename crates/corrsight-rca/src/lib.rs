//! # Corrsight RCA
//!
//! The root-cause narrative pipeline:
//! - Point-in-time metric context builder (instant queries + banded
//!   interpretation)
//! - Correlation-engine client
//! - Reasoning-service client with failure classification
//! - Dual-path narrative generator (live reasoning call or
//!   deterministic template) with a one-time startup self-test
//! - Confidence-range batch filtering for on-demand analysis

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod batch;
pub mod context;
pub mod engine_client;
pub mod narrative;
pub mod reasoning;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::ConfidenceRange;
    pub use crate::context::ContextBuilder;
    pub use crate::engine_client::CorrelationEngineClient;
    pub use crate::narrative::{NarrativeGenerator, RcaPipeline, ReasoningStatus};
    pub use crate::reasoning::{ReasoningBackend, ReasoningClient};
}
