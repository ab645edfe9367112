//! Combines merged spans, pattern confidence, and context score into a verdict.

use super::{Category, DetectionResult, Span};

/// Default pattern confidence a text must exceed to be profane.
pub const DEFAULT_PROFANE_THRESHOLD: f32 = 0.7;

/// Default context score at which tone alone makes a text profane.
pub const DEFAULT_CONTEXT_THRESHOLD: f32 = 0.6;

/// Thresholds used by [`compose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Pattern confidence must be strictly above this.
    pub profane: f32,
    /// Context score must reach this to promote a clean verdict.
    pub context: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            profane: DEFAULT_PROFANE_THRESHOLD,
            context: DEFAULT_CONTEXT_THRESHOLD,
        }
    }
}

/// Evidence gathered by the pattern pipeline for one text.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    /// Merged spans, in the coordinates they will be reported in.
    pub spans: Vec<Span>,
    /// Distinct matched categories.
    pub categories: Vec<Category>,
    /// Highest weight among matched categories, 0 if none matched.
    pub max_confidence: f32,
    /// Context score of the text.
    pub context_score: f32,
}

/// Builds the final result.
///
/// A text is profane when it has spans and its pattern confidence clears
/// `thresholds.profane`. Otherwise a context score that reaches
/// `thresholds.context` promotes it, and the reported confidence becomes the
/// larger of the two. Context scores below the threshold are not reported.
pub fn compose(
    processed_text: impl Into<String>,
    evidence: Evidence,
    thresholds: Thresholds,
) -> DetectionResult {
    let mut is_profane = !evidence.spans.is_empty() && evidence.max_confidence > thresholds.profane;
    let mut confidence = evidence.max_confidence;

    if !is_profane && evidence.context_score >= thresholds.context {
        is_profane = true;
        confidence = confidence.max(evidence.context_score);
    }

    DetectionResult {
        is_profane,
        confidence: confidence.clamp(0.0, 1.0),
        toxic_spans: evidence.spans,
        processed_text: processed_text.into(),
        detected_categories: Some(evidence.categories),
        error: None,
    }
}
