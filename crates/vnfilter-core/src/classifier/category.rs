//! Profanity categories, spans, and the detection result.

use serde::{Deserialize, Serialize};

/// Profanity categories a pattern rule can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Direct vulgar terms and their abbreviations (đm, vcl, ...).
    Explicit,
    /// Insults built from an address term plus a derogatory word.
    Contextual,
    /// Terms spelled with filler symbols to dodge a word filter.
    Disguised,
    /// Threats and calls to violence.
    HateSpeech,
}

impl Category {
    /// Returns all categories in catalog declaration order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Explicit,
            Category::Contextual,
            Category::Disguised,
            Category::HateSpeech,
        ]
    }

    /// Returns the wire tag used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Explicit => "explicit",
            Category::Contextual => "contextual",
            Category::Disguised => "disguised",
            Category::HateSpeech => "hate_speech",
        }
    }

    /// Confidence reported when a rule of this category matches.
    pub fn weight(&self) -> f32 {
        match self {
            Category::Explicit => 0.95,
            Category::Contextual => 0.85,
            Category::Disguised => 0.80,
            Category::HateSpeech => 0.90,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open character range `[start, end)`.
///
/// Serialized as a two-element array, matching the `toxic_spans` wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[usize; 2]", try_from = "[usize; 2]")]
pub struct Span {
    /// First character index (inclusive).
    pub start: usize,
    /// Last character index (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers no characters.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `other` starts inside or right at the end of this span.
    pub fn overlaps_or_touches(&self, other: &Span) -> bool {
        other.start <= self.end && self.start <= other.end
    }
}

impl From<Span> for [usize; 2] {
    fn from(span: Span) -> Self {
        [span.start, span.end]
    }
}

impl TryFrom<[usize; 2]> for Span {
    type Error = String;

    fn try_from([start, end]: [usize; 2]) -> Result<Self, Self::Error> {
        if end <= start {
            return Err(format!("span end {} must exceed start {}", end, start));
        }
        Ok(Span { start, end })
    }
}

/// Result of running a detector over one input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the text is classified as profane.
    pub is_profane: bool,
    /// Heuristic confidence (0.0 to 1.0).
    pub confidence: f32,
    /// Merged spans, sorted by start and pairwise disjoint.
    pub toxic_spans: Vec<Span>,
    /// The trimmed input text the spans refer to.
    pub processed_text: String,
    /// Distinct categories that matched (pattern detector only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_categories: Option<Vec<Category>>,
    /// Set when the input was rejected or the detector was unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// Creates a clean, zero-confidence result for the given text.
    pub fn clean(processed_text: impl Into<String>) -> Self {
        Self {
            is_profane: false,
            confidence: 0.0,
            toxic_spans: Vec::new(),
            processed_text: processed_text.into(),
            detected_categories: None,
            error: None,
        }
    }

    /// Creates a negative result annotated with an error message.
    pub fn failed(processed_text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::clean(processed_text)
        }
    }

    /// Returns true if the given category matched.
    pub fn has_category(&self, category: Category) -> bool {
        self.detected_categories
            .as_ref()
            .is_some_and(|c| c.contains(&category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_all_returns_all_variants() {
        let all = Category::all();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], Category::Explicit);
        assert_eq!(all[3], Category::HateSpeech);
    }

    #[test]
    fn category_weights() {
        assert_eq!(Category::Explicit.weight(), 0.95);
        assert_eq!(Category::Contextual.weight(), 0.85);
        assert_eq!(Category::Disguised.weight(), 0.80);
        assert_eq!(Category::HateSpeech.weight(), 0.90);
        for category in Category::all() {
            assert!((0.0..=1.0).contains(&category.weight()));
        }
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::HateSpeech).unwrap();
        assert_eq!(json, "\"hate_speech\"");
        assert_eq!(Category::HateSpeech.to_string(), "hate_speech");
    }

    #[test]
    fn span_serializes_as_pair() {
        let json = serde_json::to_string(&Span::new(3, 8)).unwrap();
        assert_eq!(json, "[3,8]");
        let span: Span = serde_json::from_str("[0,5]").unwrap();
        assert_eq!(span, Span::new(0, 5));
    }

    #[test]
    fn span_rejects_empty_range() {
        assert!(serde_json::from_str::<Span>("[5,5]").is_err());
        assert!(serde_json::from_str::<Span>("[6,2]").is_err());
    }

    #[test]
    fn span_touching() {
        let a = Span::new(0, 5);
        assert!(a.overlaps_or_touches(&Span::new(5, 9)));
        assert!(a.overlaps_or_touches(&Span::new(3, 4)));
        assert!(!a.overlaps_or_touches(&Span::new(6, 9)));
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn clean_result_is_zero() {
        let result = DetectionResult::clean("xin chào");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
        assert!(result.toxic_spans.is_empty());
        assert!(result.error.is_none());
    }

    #[test]
    fn result_omits_optional_fields() {
        let json = serde_json::to_value(DetectionResult::clean("")).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("detected_categories").is_none());
        assert_eq!(json["toxic_spans"], serde_json::json!([]));
    }

    #[test]
    fn failed_result_carries_error() {
        let result = DetectionResult::failed("abc", "model is still loading");
        assert!(!result.is_profane);
        assert_eq!(result.error.as_deref(), Some("model is still loading"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "model is still loading");
    }
}
