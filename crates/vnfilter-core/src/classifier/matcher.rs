//! Runs the pattern catalog over normalized text and collects raw hits.

use super::{Category, PatternCatalog, Span};

/// One raw rule match, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    /// Char range in the normalized text.
    pub span: Span,
    /// Category of the rule that matched.
    pub category: Category,
    /// Index of the rule within its category.
    pub rule: usize,
    /// The matched text.
    pub matched_text: String,
}

/// Finds every non-overlapping match of every rule, in catalog order.
///
/// Overlapping hits from different rules are all kept. Offsets are char
/// indices into `normalized`.
pub fn find_hits(catalog: &PatternCatalog, normalized: &str) -> Vec<PatternHit> {
    let mut hits = Vec::new();
    if normalized.is_empty() {
        return hits;
    }

    let offsets = CharOffsets::new(normalized);
    for patterns in catalog.categories() {
        // Fast check: does any rule of this category match?
        if !patterns.is_match(normalized) {
            continue;
        }
        for rule in patterns.matching_rules(normalized) {
            for m in patterns.regexes()[rule].find_iter(normalized) {
                if m.is_empty() {
                    continue;
                }
                hits.push(PatternHit {
                    span: Span::new(offsets.char_index(m.start()), offsets.char_index(m.end())),
                    category: patterns.category(),
                    rule,
                    matched_text: m.as_str().to_string(),
                });
            }
        }
    }
    hits
}

/// Converts regex byte offsets into char offsets.
struct CharOffsets {
    /// Byte offset of every char boundary, including the end of the text.
    boundaries: Vec<usize>,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { boundaries }
    }

    fn char_index(&self, byte: usize) -> usize {
        // Regex matches always fall on char boundaries.
        match self.boundaries.binary_search(&byte) {
            Ok(index) | Err(index) => index,
        }
    }
}
