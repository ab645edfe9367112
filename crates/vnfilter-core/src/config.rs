//! Detector configuration.
//!
//! Configuration is a JSON document; every field is optional and falls back
//! to its default. Model file locations can also be set from the
//! environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classifier::verdict::{DEFAULT_CONTEXT_THRESHOLD, DEFAULT_PROFANE_THRESHOLD};
use crate::classifier::{ModelConfig, Thresholds};

/// Environment variable overriding the ONNX model path.
pub const ENV_MODEL_PATH: &str = "VNFILTER_MODEL_PATH";

/// Environment variable overriding the tokenizer path.
pub const ENV_TOKENIZER_PATH: &str = "VNFILTER_TOKENIZER_PATH";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which detection path answers requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Rule-based pattern detector.
    #[default]
    Pattern,
    /// PhoBERT token classifier.
    Model,
}

impl Strategy {
    /// Returns the strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Pattern => "pattern",
            Strategy::Model => "model",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" | "patterns" => Ok(Strategy::Pattern),
            "model" | "ml" => Ok(Strategy::Model),
            other => Err(ConfigError::Invalid(format!(
                "unknown strategy '{}' (expected 'pattern' or 'model')",
                other
            ))),
        }
    }
}

/// Configuration for [`ProfanityDetector`](crate::ProfanityDetector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection path.
    pub strategy: Strategy,
    /// Pattern confidence a text must exceed to be profane.
    pub profane_threshold: f32,
    /// Context score at which tone alone makes a text profane.
    pub context_threshold: f32,
    /// Answer with the pattern detector while the model is unavailable.
    pub fallback_to_patterns: bool,
    /// Token classifier settings, used by the model strategy.
    pub model: ModelConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            profane_threshold: DEFAULT_PROFANE_THRESHOLD,
            context_threshold: DEFAULT_CONTEXT_THRESHOLD,
            fallback_to_patterns: false,
            model: ModelConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Loads and validates a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        debug!(path = %path.display(), strategy = %config.strategy, "Loaded config");
        Ok(config)
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `VNFILTER_MODEL_PATH` and `VNFILTER_TOKENIZER_PATH`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_MODEL_PATH).filter(|p| !p.is_empty()) {
            self.model.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_TOKENIZER_PATH).filter(|p| !p.is_empty()) {
            self.model.tokenizer_path = PathBuf::from(path);
        }
        self
    }

    /// Checks that thresholds are probabilities and the sequence length is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("profane_threshold", self.profane_threshold),
            ("context_threshold", self.context_threshold),
            ("model.threshold", self.model.threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.model.max_length == 0 {
            return Err(ConfigError::Invalid(
                "model.max_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds for the pattern detector.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            profane: self.profane_threshold,
            context: self.context_threshold,
        }
    }
}
