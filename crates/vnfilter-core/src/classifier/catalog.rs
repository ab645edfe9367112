//! Fixed catalog of categorized profanity rules.
//!
//! Every rule is compiled case-insensitive and Unicode-aware once, when the
//! catalog is built. A rule that fails to compile aborts construction.

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use thiserror::Error;
use tracing::info;

use super::Category;

/// A rule failed to compile while building the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A single pattern is malformed.
    #[error("invalid {category} pattern {pattern:?}: {source}")]
    InvalidPattern {
        category: Category,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A tone indicator rule is malformed.
    #[error("invalid context indicator pattern {pattern:?}: {source}")]
    InvalidIndicator {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A category was given no rules.
    #[error("category {0} has no rules")]
    EmptyCategory(Category),
}

/// Returns the built-in rules for a category, in matching order.
pub fn default_rules(category: Category) -> &'static [&'static str] {
    match category {
        Category::Explicit => &[
            r"\b(đm|dm|đmm|đcm|dcm)\b",
            r"\b(vcl|vkl|vl)\b",
            r"\b(cc|cl|lol|loz)\b",
            r"\b(shit|fuck|bitch)\b",
            r"\b(đĩ|đỉ)\b",
            r"\b(cặc|buồi|lồn)\b",
            r"\b(chết tiệt|chết tía)\b",
        ],
        Category::Contextual => &[
            r"\b(thằng|con|đồ)\s+(ngu|khùng|điên|đần|ngốc)\b",
            r"\b(đồ|con)\s+(đĩ|khốn|khỉ|chó|heo)\b",
            r"\b(mày|mi|m)\s+(ngu|khùng|điên)\b",
            r"\b(tao|t)\s+(ghét|chửi|đánh)\s+(mày|mi|m)\b",
            r"\b(cút|biến|đi chết)\s+(đi|mẹ|mày)\b",
        ],
        // Letters separated by filler symbols: * @ # . _ -
        Category::Disguised => &[
            r"\b[dđ][*@#._\-]+m{1,2}\b",
            r"\bv([*@#._\-]+c[*@#._\-]*|c[*@#._\-]+)l\b",
            r"\bs[*@#._\-]*h[*@#._\-]*i?[*@#._\-]*t\b",
            r"\bf[*@#._\-]*u?[*@#._\-]*c[*@#._\-]*k\b",
        ],
        Category::HateSpeech => &[
            r"\b(giết|đánh|chém|đập)\s+(chết|tơi tả|tan nát)\b",
            r"\b(đi chết|chết đi|chết mẹ)\b",
            r"\b(khủng bố|phá hoại|tàn phá)\b",
        ],
    }
}

/// Compiled rules for one category.
pub struct CategoryPatterns {
    category: Category,
    /// Regex set for fast multi-pattern prefiltering.
    regex_set: RegexSet,
    /// Individual regexes for extracting match positions.
    regexes: Vec<Regex>,
}

impl CategoryPatterns {
    /// The category these rules belong to.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns true if any rule matches somewhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex_set.is_match(text)
    }

    /// Indices of the rules that match `text`, in declaration order.
    pub fn matching_rules(&self, text: &str) -> Vec<usize> {
        self.regex_set.matches(text).into_iter().collect()
    }

    /// The compiled rules, in declaration order.
    pub fn regexes(&self) -> &[Regex] {
        &self.regexes
    }

    fn compile(category: Category, patterns: &[&str]) -> Result<Self, CatalogError> {
        if patterns.is_empty() {
            return Err(CatalogError::EmptyCategory(category));
        }

        let regexes = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .unicode(true)
                    .build()
                    .map_err(|source| CatalogError::InvalidPattern {
                        category,
                        pattern: (*p).to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Every pattern compiled on its own, so a set failure is a size limit.
        let regex_set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .unicode(true)
            .build()
            .map_err(|source| CatalogError::InvalidPattern {
                category,
                pattern: patterns.join(" | "),
                source,
            })?;

        Ok(Self {
            category,
            regex_set,
            regexes,
        })
    }
}

impl std::fmt::Debug for CategoryPatterns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryPatterns")
            .field("category", &self.category)
            .field("rules", &self.regexes.len())
            .finish()
    }
}

/// Immutable table of compiled rules, one entry per category.
///
/// Built once and shared read-only between any number of callers.
#[derive(Debug)]
pub struct PatternCatalog {
    patterns: Vec<CategoryPatterns>,
}

impl PatternCatalog {
    /// Builds the catalog from the built-in rules.
    pub fn new() -> Result<Self, CatalogError> {
        let table: Vec<(Category, &[&str])> = Category::all()
            .iter()
            .map(|&category| (category, default_rules(category)))
            .collect();
        Self::from_table(&table)
    }

    /// Builds a catalog from an explicit table, in the given order.
    pub fn from_table(table: &[(Category, &[&str])]) -> Result<Self, CatalogError> {
        let patterns = table
            .iter()
            .map(|(category, rules)| CategoryPatterns::compile(*category, rules))
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self { patterns };
        info!(
            categories = catalog.patterns.len(),
            patterns = catalog.pattern_count(),
            "Profanity pattern catalog compiled"
        );
        Ok(catalog)
    }

    /// Category entries in declaration order.
    pub fn categories(&self) -> &[CategoryPatterns] {
        &self.patterns
    }

    /// Total number of compiled rules.
    pub fn pattern_count(&self) -> usize {
        self.patterns.iter().map(|p| p.regexes.len()).sum()
    }

    /// Rules of one category, if present.
    pub fn get(&self, category: Category) -> Option<&CategoryPatterns> {
        self.patterns.iter().find(|p| p.category == category)
    }
}
