//! Error types for Corrsight.
//!
//! A single workspace-wide error enum keeps failure classification
//! consistent across the analyzer, the fetcher, and the RCA pipeline.
//! Constructors mirror how errors are raised at call sites.

use thiserror::Error;

/// Result alias used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Workspace-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or malformed configuration, detected at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// An external dependency (metrics store, correlation engine,
    /// reasoning service) is unreachable or timed out
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Fewer aligned samples than the minimum required for analysis.
    /// Expected and frequent; callers skip the pair silently.
    #[error("insufficient data: {got} aligned samples, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    /// Reasoning service rejected the configured credential
    #[error("reasoning service authentication failed: {0}")]
    ReasoningAuth(String),

    /// Reasoning service quota or rate limit exhausted
    #[error("reasoning service rate limit exceeded: {0}")]
    ReasoningQuota(String),

    /// Reasoning service returned an unusable response
    #[error("reasoning service error: {0}")]
    Reasoning(String),

    /// Malformed response from an external service
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Input validation failure
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dependency-unavailable error
    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::DependencyUnavailable(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for conditions that are expected during normal operation
    /// and must never abort a batch or tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DependencyUnavailable(_) | Self::InsufficientData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_is_recoverable() {
        let err = Error::InsufficientData { got: 3, need: 5 };
        assert!(err.is_recoverable());
        assert!(Error::dependency("store down").is_recoverable());
        assert!(!Error::config("bad key").is_recoverable());
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::InsufficientData { got: 2, need: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: 2 aligned samples, need at least 5"
        );
    }
}
