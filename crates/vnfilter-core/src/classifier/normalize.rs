//! Text normalization against simple character-substitution obfuscation.
//!
//! Substitutions are applied in a single left-to-right pass, one character
//! at a time. No output character is itself a substitution key, so
//! normalizing twice yields the same text as normalizing once.

use super::Span;

/// Looks up a character in the substitution table.
///
/// `None` means the character is kept; `Some(None)` means it is deleted.
fn substitute(ch: char) -> Option<Option<char>> {
    match ch {
        '0' => Some(Some('o')),
        '1' => Some(Some('i')),
        '3' => Some(Some('e')),
        '4' => Some(Some('a')),
        '5' => Some(Some('s')),
        '@' => Some(Some('a')),
        '+' => Some(Some('t')),
        '#' | '*' => Some(None),
        _ => None,
    }
}

/// Trims the text and applies the substitution table.
///
/// Whitespace exposed at either edge by a deletion is trimmed too. Case and
/// diacritics are preserved.
pub fn normalize(text: &str) -> String {
    NormalizedText::new(text).text
}

/// Normalized text with a char-level map back to the trimmed original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    original: String,
    text: String,
    /// `origin[i]` is the char index in `original` that produced char `i` of `text`.
    origin: Vec<usize>,
}

impl NormalizedText {
    /// Normalizes `text`, remembering where every output char came from.
    pub fn new(text: &str) -> Self {
        let original = text.trim();
        let kept: Vec<(char, usize)> = original
            .chars()
            .enumerate()
            .filter_map(|(index, ch)| match substitute(ch) {
                Some(replacement) => replacement.map(|r| (r, index)),
                None => Some((ch, index)),
            })
            .collect();

        // Deletions can expose edge whitespace: "đm #" keeps "đm ".
        let first = kept.iter().position(|(ch, _)| !ch.is_whitespace());
        let last = kept.iter().rposition(|(ch, _)| !ch.is_whitespace());
        let kept = match (first, last) {
            (Some(first), Some(last)) => &kept[first..=last],
            _ => &[][..],
        };

        let normalized: String = kept.iter().map(|(ch, _)| *ch).collect();
        let origin = kept.iter().map(|(_, index)| *index).collect();

        Self {
            original: original.to_string(),
            text: normalized,
            origin,
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The trimmed input text.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Returns true if nothing is left after trimming and deletions.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Maps a span over the normalized text onto the trimmed original.
    ///
    /// Deleted characters inside the span are covered by the result; deleted
    /// characters just outside it are not.
    pub fn to_original(&self, span: Span) -> Option<Span> {
        if span.is_empty() || span.end > self.origin.len() {
            return None;
        }
        let start = self.origin[span.start];
        let end = self.origin[span.end - 1] + 1;
        Some(Span::new(start, end))
    }
}
