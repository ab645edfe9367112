//! vnfilter core - Vietnamese profanity detection.
//!
//! This crate classifies Vietnamese text as profane or clean and reports
//! the character spans that triggered the verdict.
//!
//! ## Detection paths
//!
//! - **Pattern** (default): normalizes obfuscated spellings, matches a
//!   catalog of per-category rules, merges the hit spans and adds a tone
//!   score for aggressive phrasing.
//! - **Model**: a fine-tuned PhoBERT token classifier exported to ONNX
//!   (requires the `ml` feature). It loads in the background; requests made
//!   before it is ready get a negative result with an explanatory `error`.
//!
//! ## Example
//!
//! ```
//! use vnfilter_core::ProfanityDetector;
//!
//! let detector = ProfanityDetector::pattern_only().unwrap();
//! let result = detector.detect("Đm, tại sao lại thế này?");
//! assert!(result.is_profane);
//! assert_eq!(result.toxic_spans[0].start, 0);
//! ```

pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;

pub use classifier::{Category, DetectionResult, ModelHandle, ModelStatus, PatternDetector, Span};
pub use config::{ConfigError, DetectorConfig, Strategy};
pub use detector::{DetectorInfo, ModelInfo, ProfanityDetector, SAMPLE_TEXTS};
pub use error::{Result, VnFilterError};
