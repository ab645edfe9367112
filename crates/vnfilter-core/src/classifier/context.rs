//! Tone heuristics that flag aggressive text without explicit vocabulary.
//!
//! Each indicator that fires anywhere in the text adds one step of 0.2. The
//! score is capped at 0.8.

use regex::{Regex, RegexBuilder};

use super::normalize::NormalizedText;
use super::CatalogError;

/// Score levels by number of indicators fired, capped at the last entry.
const SCORE_LEVELS: [f32; 5] = [0.0, 0.2, 0.4, 0.6, 0.8];

/// Highest score the context pass can report.
pub const MAX_CONTEXT_SCORE: f32 = 0.8;

/// A tone indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// "tao/t" + sẽ/phải/muốn: first-person threat.
    FirstPersonModal,
    /// "mày/mi/m" + phải/sẽ/nên: ordering the addressee around.
    SecondPersonModal,
    /// đừng/không/chớ + có/dám/được: negated imperative.
    NegatedImperative,
    /// Two or more exclamation marks in a row.
    RepeatedExclamation,
    /// Three or more upper-case letters in a row (shouting).
    Shouting,
    /// Three or more upper-case words in a row.
    ShoutedPhrase,
}

impl Indicator {
    /// All indicators in evaluation order.
    pub fn all() -> &'static [Indicator] {
        &[
            Indicator::FirstPersonModal,
            Indicator::SecondPersonModal,
            Indicator::NegatedImperative,
            Indicator::RepeatedExclamation,
            Indicator::Shouting,
            Indicator::ShoutedPhrase,
        ]
    }

    fn pattern(&self) -> &'static str {
        match self {
            Indicator::FirstPersonModal => r"\b(tao|t)\s+(sẽ|phải|muốn)\s+",
            Indicator::SecondPersonModal => r"\b(mày|mi|m)\s+(phải|sẽ|nên)\s+",
            Indicator::NegatedImperative => r"\b(đừng|không|chớ)\s+(có|dám|được)\s+",
            Indicator::RepeatedExclamation => r"!{2,}",
            Indicator::Shouting => r"\p{Lu}{3,}",
            Indicator::ShoutedPhrase => r"\b\p{Lu}+(\s+\p{Lu}+){2,}\b",
        }
    }

    /// Shouting is judged on the original text; the rest ignore case and
    /// run on the normalized text.
    fn case_sensitive(&self) -> bool {
        matches!(self, Indicator::Shouting | Indicator::ShoutedPhrase)
    }
}

/// Outcome of the context pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextScore {
    /// Indicators that fired, in evaluation order.
    pub indicators: Vec<Indicator>,
    /// Accumulated score in `[0, MAX_CONTEXT_SCORE]`.
    pub score: f32,
}

impl ContextScore {
    fn from_indicators(indicators: Vec<Indicator>) -> Self {
        let level = indicators.len().min(SCORE_LEVELS.len() - 1);
        Self {
            indicators,
            score: SCORE_LEVELS[level],
        }
    }
}

/// Compiled tone indicators.
#[derive(Debug)]
pub struct ContextScorer {
    rules: Vec<(Indicator, Regex)>,
}

impl ContextScorer {
    /// Compiles the indicator rules.
    pub fn new() -> Result<Self, CatalogError> {
        let rules = Indicator::all()
            .iter()
            .map(|&indicator| {
                RegexBuilder::new(indicator.pattern())
                    .case_insensitive(!indicator.case_sensitive())
                    .unicode(true)
                    .build()
                    .map(|regex| (indicator, regex))
                    .map_err(|source| CatalogError::InvalidIndicator {
                        pattern: indicator.pattern().to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Scores a text.
    pub fn score(&self, text: &NormalizedText) -> ContextScore {
        let indicators = self
            .rules
            .iter()
            .filter(|(indicator, regex)| {
                let haystack = if indicator.case_sensitive() {
                    text.original()
                } else {
                    text.as_str()
                };
                regex.is_match(haystack)
            })
            .map(|(indicator, _)| *indicator)
            .collect();
        ContextScore::from_indicators(indicators)
    }
}
