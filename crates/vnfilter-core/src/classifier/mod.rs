//! Vietnamese profanity classification.
//!
//! Two detection paths share one result type: a rule-based pattern
//! detector and a PhoBERT token classifier that loads in the background.

mod catalog;
mod category;
pub mod context;
pub mod loader;
pub mod matcher;
pub mod merge;
pub mod normalize;
mod pattern;
pub mod token;
pub mod verdict;

pub use catalog::{default_rules, CatalogError, CategoryPatterns, PatternCatalog};
pub use category::{Category, DetectionResult, Span};
pub use context::{ContextScore, ContextScorer, Indicator};
pub use loader::{ModelHandle, ModelStatus};
pub use merge::merge_spans;
pub use normalize::{normalize, NormalizedText};
pub use pattern::PatternDetector;
pub use token::{
    decode_predictions, ModelConfig, ModelError, OnnxTokenClassifier, TokenInference,
    TokenLabel, TokenPrediction,
};
pub use verdict::{compose, Evidence, Thresholds};
