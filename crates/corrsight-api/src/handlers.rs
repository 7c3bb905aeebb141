//! API request handlers.
//!
//! One module per service surface:
//! - Correlation analyzer read API
//! - RCA status and on-demand analysis API

pub mod correlation;
pub mod rca;

pub use correlation::{
    BusinessCorrelationsResponse, ConfidenceBands, ConfigResponse, CorrelationApiState,
    CorrelationsQuery, CorrelationsResponse, SummaryResponse, ThresholdsResponse,
};
pub use rca::{AnalyzeQuery, RcaApiState};
