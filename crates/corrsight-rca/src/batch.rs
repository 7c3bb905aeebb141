//! Confidence-range filtering for on-demand batch analysis.
//!
//! /analyze takes an inclusive confidence window. The window is
//! documented as self-correcting rather than rejecting: out-of-range
//! bounds are clamped into [0, 1], and an inverted window is widened to
//! a small band above the lower bound.

use corrsight_core::events::CorrelationEvent;

/// Inclusive confidence window for selecting events to analyze
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceRange {
    pub min: f64,
    pub max: f64,
}

impl ConfidenceRange {
    /// Build a valid range from caller-supplied bounds.
    ///
    /// Both bounds clamp to [0, 1]. If the clamped max falls below the
    /// clamped min, max becomes min + 0.1 capped at 1.0.
    pub fn clamped(min: f64, max: f64) -> Self {
        let min = min.clamp(0.0, 1.0);
        let mut max = max.clamp(0.0, 1.0);
        if max < min {
            max = (min + 0.1).min(1.0);
        }
        Self { min, max }
    }

    /// Inclusive on both bounds
    pub fn contains(&self, confidence: f64) -> bool {
        confidence >= self.min && confidence <= self.max
    }
}

/// Select the events inside `range`, ranked by descending confidence.
/// Equal confidences keep their incoming relative order.
pub fn filter_and_rank(
    events: Vec<CorrelationEvent>,
    range: ConfidenceRange,
) -> Vec<CorrelationEvent> {
    let mut selected: Vec<CorrelationEvent> = events
        .into_iter()
        .filter(|e| range.contains(e.confidence))
        .collect();
    selected.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    selected
}
