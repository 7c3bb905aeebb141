//! # Corrsight API
//!
//! HTTP surfaces for both Corrsight services:
//! - the correlation analyzer's read API (history, summaries, config)
//! - the RCA service's status and on-demand /analyze API
//!
//! Both routers are read-mostly: the background analysis loop owns all
//! writes, handlers only snapshot shared state. /analyze is the one
//! endpoint that performs outbound work on request.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod exposition;
pub mod handlers;
pub mod routes;

/// Shared API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Per-request timeout applied to the whole router
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

pub use handlers::{CorrelationApiState, RcaApiState};
pub use routes::{correlation_router, rca_router};
