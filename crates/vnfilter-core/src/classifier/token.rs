//! PhoBERT token classifier (alternative detection path).
//!
//! The model tags every sub-word token as clean (`O`), the beginning of a
//! toxic run (`B-T`), or inside one (`I-T`). Inference runs through ONNX
//! when built with the `ml` feature; the span decoding below is plain Rust
//! and always available.

#[cfg(feature = "ml")]
use std::path::Path;
use std::path::PathBuf;
#[cfg(feature = "ml")]
use std::time::Instant;

#[cfg(feature = "ml")]
use tracing::debug;

use super::merge::merge_spans;
use super::{DetectionResult, Span};

/// Token labels, in the order of the model's output logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenLabel {
    /// Clean token.
    Outside,
    /// First token of a toxic run.
    BeginToxic,
    /// Continuation of a toxic run.
    InsideToxic,
}

impl TokenLabel {
    /// All labels, indexed by logit position.
    pub const ALL: [TokenLabel; 3] = [
        TokenLabel::Outside,
        TokenLabel::BeginToxic,
        TokenLabel::InsideToxic,
    ];

    /// Label for a logit index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Tag used during training.
    pub fn tag(&self) -> &'static str {
        match self {
            TokenLabel::Outside => "O",
            TokenLabel::BeginToxic => "B-T",
            TokenLabel::InsideToxic => "I-T",
        }
    }

    /// Returns true for `B-T` and `I-T`.
    pub fn is_toxic(&self) -> bool {
        !matches!(self, TokenLabel::Outside)
    }
}

/// Prediction for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrediction {
    /// Argmax label.
    pub label: TokenLabel,
    /// Softmax probability of the argmax label.
    pub probability: f32,
    /// Byte range of the token in the input text. Special tokens have none.
    pub offsets: Option<(usize, usize)>,
}

/// Error types for the token classifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Model file not found.
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Tokenizer file not found.
    #[error("Tokenizer file not found: {0}")]
    TokenizerNotFound(String),

    /// ONNX runtime error.
    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    /// Tokenizer error.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Inference error.
    #[error("Inference error: {0}")]
    Inference(String),

    /// ML feature not enabled.
    #[error("ML feature not enabled - rebuild with --features ml")]
    MlNotEnabled,

    /// The model is still being loaded.
    #[error("AI model is still loading. Please try again in a moment.")]
    Loading,

    /// The model failed to load.
    #[error("AI model failed to load: {0}")]
    Unavailable(String),
}

#[cfg(feature = "ml")]
impl From<ort::Error> for ModelError {
    fn from(e: ort::Error) -> Self {
        ModelError::Runtime(e.to_string())
    }
}

#[cfg(feature = "ml")]
impl From<tokenizers::Error> for ModelError {
    fn from(e: tokenizers::Error) -> Self {
        ModelError::Tokenizer(e.to_string())
    }
}

/// Anything that can tag the tokens of a text.
///
/// Implemented by [`OnnxTokenClassifier`]; tests plug in fixed predictions.
pub trait TokenInference: Send {
    /// Predicts a label for every token of `text`.
    fn predict(&mut self, text: &str) -> Result<Vec<TokenPrediction>, ModelError>;

    /// Returns the name of this model for logging.
    fn name(&self) -> &'static str;
}

/// Turns token predictions into a detection result.
///
/// Every toxic token contributes its char span and probability. Adjacent
/// tokens of one run merge into a single span. The text is profane when
/// at least one span exists and the best probability exceeds `threshold`.
pub fn decode_predictions(
    text: &str,
    predictions: &[TokenPrediction],
    threshold: f32,
) -> DetectionResult {
    let mut spans = Vec::new();
    let mut max_confidence = 0.0_f32;

    for prediction in predictions.iter().filter(|p| p.label.is_toxic()) {
        let Some((start, end)) = prediction.offsets else {
            continue;
        };
        if start >= end || end > text.len() {
            continue;
        }
        let (Some(prefix), Some(token)) = (text.get(..start), text.get(start..end)) else {
            continue;
        };
        max_confidence = max_confidence.max(prediction.probability);
        let char_start = prefix.chars().count();
        spans.push(Span::new(char_start, char_start + token.chars().count()));
    }

    let toxic_spans = merge_spans(&spans);
    let is_profane = !toxic_spans.is_empty() && max_confidence > threshold;

    DetectionResult {
        is_profane,
        confidence: max_confidence.clamp(0.0, 1.0),
        toxic_spans,
        processed_text: text.to_string(),
        detected_categories: None,
        error: None,
    }
}

/// Configuration for the token classifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX export of the fine-tuned model.
    pub model_path: PathBuf,
    /// Path to the tokenizer.json file.
    pub tokenizer_path: PathBuf,
    /// Maximum sequence length (tokens).
    pub max_length: usize,
    /// Token probability a text must exceed to be profane.
    pub threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let models_dir = default_models_dir();
        Self {
            model_path: models_dir.join("phobert_profanity.onnx"),
            tokenizer_path: models_dir.join("tokenizer.json"),
            max_length: 128,
            threshold: 0.7,
        }
    }
}

/// Per-user model directory, falling back to `./models`.
pub fn default_models_dir() -> PathBuf {
    directories::ProjectDirs::from("", "vnfilter", "vnfilter")
        .map(|dirs| dirs.data_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}

/// Token classifier backed by an ONNX export of the fine-tuned PhoBERT model.
#[cfg(feature = "ml")]
pub struct OnnxTokenClassifier {
    session: ort::session::Session,
    tokenizer: tokenizers::Tokenizer,
    config: ModelConfig,
}

#[cfg(feature = "ml")]
impl OnnxTokenClassifier {
    /// Loads the ONNX model and tokenizer.
    ///
    /// Returns an error if either file is missing or unreadable.
    pub fn load(config: ModelConfig) -> Result<Self, ModelError> {
        use ort::session::{builder::GraphOptimizationLevel, Session};

        if !Path::new(&config.model_path).exists() {
            return Err(ModelError::ModelNotFound(
                config.model_path.display().to_string(),
            ));
        }
        if !Path::new(&config.tokenizer_path).exists() {
            return Err(ModelError::TokenizerNotFound(
                config.tokenizer_path.display().to_string(),
            ));
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(&config.model_path)?;

        let tokenizer = tokenizers::Tokenizer::from_file(&config.tokenizer_path)?;

        Ok(Self {
            session,
            tokenizer,
            config,
        })
    }
}

#[cfg(feature = "ml")]
impl TokenInference for OnnxTokenClassifier {
    fn predict(&mut self, text: &str) -> Result<Vec<TokenPrediction>, ModelError> {
        use ort::value::Tensor;

        let start = Instant::now();

        let encoding = self.tokenizer.encode(text, true)?;

        let seq_len = encoding.get_ids().len().min(self.config.max_length);
        let input_ids: Vec<i64> = encoding.get_ids()[..seq_len]
            .iter()
            .map(|&id| id as i64)
            .collect();
        let attention_mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
            .iter()
            .map(|&m| m as i64)
            .collect();
        let special = &encoding.get_special_tokens_mask()[..seq_len];
        let offsets = &encoding.get_offsets()[..seq_len];

        let input_ids_tensor = Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor
        ])?;

        let logits_tensor = outputs["logits"].try_extract_tensor::<f32>().map_err(|e| {
            ModelError::Inference(format!("Failed to extract logits: {}", e))
        })?;
        let shape = logits_tensor.0;
        let logits_data = logits_tensor.1;

        // Expect [1, seq_len, labels]
        let dims: Vec<_> = shape.iter().collect();
        let num_labels = TokenLabel::ALL.len();
        if dims.len() != 3 || *dims[0] != 1 || *dims[2] != num_labels as i64 {
            return Err(ModelError::Inference(format!(
                "Unexpected output shape: {:?}",
                dims
            )));
        }

        let predictions = logits_data
            .chunks(num_labels)
            .take(seq_len)
            .enumerate()
            .map(|(i, logits)| {
                let probs = softmax(logits);
                let (index, probability) = argmax(&probs);
                TokenPrediction {
                    label: TokenLabel::from_index(index).unwrap_or(TokenLabel::Outside),
                    probability,
                    offsets: (special[i] == 0).then_some(offsets[i]),
                }
            })
            .collect();

        debug!(
            tokens = seq_len,
            duration_us = start.elapsed().as_micros() as u64,
            "Token classification finished"
        );
        Ok(predictions)
    }

    fn name(&self) -> &'static str {
        "phobert-onnx"
    }
}

/// Numerically stable softmax.
#[cfg(feature = "ml")]
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(feature = "ml")]
fn argmax(probs: &[f32]) -> (usize, f32) {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}

/// Stub classifier when the ML feature is not enabled.
#[cfg(not(feature = "ml"))]
pub struct OnnxTokenClassifier {
    _config: ModelConfig,
}

#[cfg(not(feature = "ml"))]
impl OnnxTokenClassifier {
    /// Always fails: the ML feature is not enabled.
    pub fn load(_config: ModelConfig) -> Result<Self, ModelError> {
        Err(ModelError::MlNotEnabled)
    }
}

#[cfg(not(feature = "ml"))]
impl TokenInference for OnnxTokenClassifier {
    fn predict(&mut self, _text: &str) -> Result<Vec<TokenPrediction>, ModelError> {
        Err(ModelError::MlNotEnabled)
    }

    fn name(&self) -> &'static str {
        "phobert-onnx"
    }
}
