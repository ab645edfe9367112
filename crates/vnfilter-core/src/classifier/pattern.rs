//! Rule-based profanity detector.
//!
//! Pipeline: normalize → match catalog → merge spans, with a parallel
//! context pass (casing checks on the trimmed input, the rest on the
//! normalized text), then compose the verdict.
//! Spans are reported in char offsets of the trimmed input.

use std::time::Instant;

use tracing::debug;

use super::context::{ContextScore, ContextScorer};
use super::matcher::{find_hits, PatternHit};
use super::merge::merge_spans;
use super::normalize::NormalizedText;
use super::verdict::{compose, Evidence, Thresholds};
use super::{CatalogError, Category, DetectionResult, PatternCatalog, Span};

/// Stateless rule-based detector over an immutable catalog.
#[derive(Debug)]
pub struct PatternDetector {
    catalog: PatternCatalog,
    context: ContextScorer,
    thresholds: Thresholds,
}

impl PatternDetector {
    /// Creates a detector with the built-in catalog and default thresholds.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_thresholds(Thresholds::default())
    }

    /// Creates a detector with the built-in catalog and custom thresholds.
    pub fn with_thresholds(thresholds: Thresholds) -> Result<Self, CatalogError> {
        Ok(Self::from_parts(
            PatternCatalog::new()?,
            ContextScorer::new()?,
            thresholds,
        ))
    }

    /// Creates a detector from already built parts.
    pub fn from_parts(
        catalog: PatternCatalog,
        context: ContextScorer,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            catalog,
            context,
            thresholds,
        }
    }

    /// The compiled catalog.
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Classifies `text`.
    pub fn detect(&self, text: &str) -> DetectionResult {
        let start = Instant::now();
        let normalized = NormalizedText::new(text);
        if normalized.is_empty() {
            return DetectionResult::clean(normalized.original());
        }

        let hits = find_hits(&self.catalog, normalized.as_str());
        let context = self.context.score(&normalized);
        let evidence = gather_evidence(&normalized, &hits, &context);
        let result = compose(normalized.original(), evidence, self.thresholds);

        debug!(
            hits = hits.len(),
            spans = result.toxic_spans.len(),
            context = context.score,
            profane = result.is_profane,
            confidence = result.confidence,
            duration_us = start.elapsed().as_micros() as u64,
            "Pattern detection finished"
        );
        result
    }
}

fn gather_evidence(
    normalized: &NormalizedText,
    hits: &[PatternHit],
    context: &ContextScore,
) -> Evidence {
    let raw: Vec<Span> = hits.iter().map(|h| h.span).collect();
    let spans = merge_spans(&raw)
        .into_iter()
        .filter_map(|span| normalized.to_original(span))
        .collect();

    let mut categories: Vec<Category> = hits.iter().map(|h| h.category).collect();
    categories.sort();
    categories.dedup();

    let max_confidence = categories
        .iter()
        .map(Category::weight)
        .fold(0.0_f32, f32::max);

    Evidence {
        spans,
        categories,
        max_confidence,
        context_score: context.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PatternDetector {
        PatternDetector::new().unwrap()
    }

    #[test]
    fn empty_text_is_clean() {
        let result = detector().detect("");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
        assert!(result.toxic_spans.is_empty());

        let result = detector().detect("   ");
        assert!(!result.is_profane);
        assert_eq!(result.processed_text, "");
    }

    #[test]
    fn greeting_is_clean() {
        let result = detector().detect("Chào bạn, hôm nay thế nào?");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.detected_categories, Some(Vec::new()));
    }

    #[test]
    fn insult_is_contextual() {
        let result = detector().detect("Thằng ngu này không biết gì cả");
        assert!(result.is_profane);
        assert!(result.confidence >= 0.85);
        assert!(result.has_category(Category::Contextual));
        assert_eq!(result.toxic_spans, vec![Span::new(0, 9)]);
    }

    #[test]
    fn explicit_abbreviation() {
        let result = detector().detect("Đm, tại sao lại thế này?");
        assert!(result.is_profane);
        assert!(result.confidence >= 0.90);
        assert!(result.has_category(Category::Explicit));
        assert_eq!(result.toxic_spans, vec![Span::new(0, 2)]);
    }

    #[test]
    fn processed_text_is_trimmed_original() {
        let result = detector().detect("  Mày ngu qu4 đi  ");
        assert_eq!(result.processed_text, "Mày ngu qu4 đi");
        assert!(result.is_profane);
        assert_eq!(result.toxic_spans, vec![Span::new(0, 7)]);
    }

    #[test]
    fn obfuscated_terms_are_caught() {
        let result = detector().detect("v.c.l, thằng ng*u");
        assert!(result.is_profane);
        assert!(result.has_category(Category::Disguised));
        assert!(result.has_category(Category::Contextual));
    }

    #[test]
    fn spans_map_back_over_deleted_characters() {
        // '*' is deleted before matching; the span still points at "ngu".
        let text = "a*b th#ằng ngu";
        let result = detector().detect(text);
        assert!(result.is_profane);
        let span = result.toxic_spans[0];
        let covered: String = text.chars().skip(span.start).take(span.len()).collect();
        assert_eq!(covered, "th#ằng ngu");
    }

    #[test]
    fn overlapping_hits_merge_into_one_span() {
        let result = detector().detect("fuck");
        assert_eq!(result.toxic_spans, vec![Span::new(0, 4)]);
        assert_eq!(
            result.detected_categories,
            Some(vec![Category::Explicit, Category::Disguised])
        );
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn shouting_is_promoted_by_context() {
        let result = detector().detect("CÁI GÌ VẬY!!");
        assert!(result.is_profane);
        assert!(result.toxic_spans.is_empty());
        assert_eq!(result.detected_categories, Some(Vec::new()));
        assert_eq!(result.confidence, 0.6);

        let result = detector().detect("TAO SẼ ĐẾN NHÀ!!");
        assert!(result.is_profane);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn mild_tone_is_not_promoted() {
        let result = detector().detect("Cảnh đẹp quá, tôi thích lắm!!");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn results_stay_in_bounds() {
        let detector = detector();
        let texts = [
            "đm vcl thằng ngu, chết đi!!! TAO SẼ giết chết mày",
            "***###",
            "0000",
            "con chó, đồ khốn, cút đi",
            "🙂 đm 🙂",
        ];
        for text in texts {
            let result = detector.detect(text);
            assert!((0.0..=1.0).contains(&result.confidence), "{text}");
            for pair in result.toxic_spans.windows(2) {
                assert!(pair[0].end < pair[1].start, "{text}");
            }
            assert!(result.toxic_spans.iter().all(|s| s.end > s.start), "{text}");
        }
    }

    #[test]
    fn detector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PatternDetector>();
    }
}
