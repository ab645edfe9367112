//! Detector entry point.
//!
//! [`ProfanityDetector::detect`] never fails: bad input, an unavailable
//! model and internal faults all come back as a negative result with the
//! `error` field set.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::classifier::loader::panic_message;
use crate::classifier::{
    Category, DetectionResult, ModelHandle, ModelStatus, OnnxTokenClassifier, PatternDetector,
    TokenInference, TokenLabel,
};
use crate::config::{DetectorConfig, Strategy};
use crate::error::Result;

/// Built-in texts for smoke runs: three clean, three profane.
pub const SAMPLE_TEXTS: [&str; 6] = [
    "Chào bạn, hôm nay thế nào?",
    "Đây là một bài viết rất hay!",
    "Thằng ngu này không biết gì cả",
    "Đm, tại sao lại thế này?",
    "Mày ngu quá đi",
    "Cảnh đẹp quá, tôi thích lắm!",
];

/// Message for inputs that are not strings.
pub const NOT_A_STRING: &str = "text must be a string";

/// Message for requests without a `text` field.
pub const MISSING_TEXT: &str = "missing text field in request";

/// Vietnamese profanity detector.
///
/// Answers with the pattern detector or, under [`Strategy::Model`], with the
/// token classifier once it has loaded.
#[derive(Debug)]
pub struct ProfanityDetector {
    config: DetectorConfig,
    patterns: PatternDetector,
    model: Option<ModelHandle>,
}

impl ProfanityDetector {
    /// Builds a detector. Under the model strategy the model starts loading
    /// in the background and this returns immediately.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let model = match config.strategy {
            Strategy::Pattern => None,
            Strategy::Model => {
                let model_config = config.model.clone();
                Some(ModelHandle::spawn(config.model.threshold, move || {
                    OnnxTokenClassifier::load(model_config)
                        .map(|m| Box::new(m) as Box<dyn TokenInference>)
                }))
            }
        };
        Self::build(config, model)
    }

    /// Builds a detector answering through an existing model handle.
    pub fn with_model(config: DetectorConfig, model: ModelHandle) -> Result<Self> {
        config.validate()?;
        Self::build(config, Some(model))
    }

    /// Builds a pattern-only detector with default settings.
    pub fn pattern_only() -> Result<Self> {
        Self::new(DetectorConfig::default())
    }

    fn build(config: DetectorConfig, model: Option<ModelHandle>) -> Result<Self> {
        let patterns = PatternDetector::with_thresholds(config.thresholds())?;
        info!(
            strategy = %config.strategy,
            patterns = patterns.catalog().pattern_count(),
            fallback = config.fallback_to_patterns,
            "Profanity detector ready"
        );
        Ok(Self {
            config,
            patterns,
            model,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns true when requests can be answered by the configured path.
    pub fn is_ready(&self) -> bool {
        self.model.as_ref().map_or(true, ModelHandle::is_ready)
    }

    /// Waits for the model to finish loading, if there is one.
    pub async fn wait_ready(&self) -> ModelStatus {
        match &self.model {
            Some(model) => model.wait_ready().await,
            None => ModelStatus::Ready,
        }
    }

    /// Classifies `text`.
    pub fn detect(&self, text: &str) -> DetectionResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DetectionResult::clean("");
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.run(trimmed))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(error = %message, "Detection pipeline panicked");
                DetectionResult::failed(trimmed, format!("detection failed: {}", message))
            }
        }
    }

    /// Classifies a JSON value, rejecting anything but a string.
    pub fn detect_value(&self, value: &Value) -> DetectionResult {
        match value.as_str() {
            Some(text) => self.detect(text),
            None => DetectionResult::failed("", NOT_A_STRING),
        }
    }

    /// Classifies the `text` field of a JSON request body.
    pub fn detect_request(&self, request: &Value) -> DetectionResult {
        match request.get("text") {
            Some(text) => self.detect_value(text),
            None => DetectionResult::failed("", MISSING_TEXT),
        }
    }

    fn run(&self, text: &str) -> DetectionResult {
        let Some(model) = &self.model else {
            return self.patterns.detect(text);
        };

        let result = model.infer(text);
        match result.error {
            Some(note) if self.config.fallback_to_patterns => {
                let mut fallback = self.patterns.detect(text);
                fallback.error = Some(note);
                fallback
            }
            _ => result,
        }
    }

    /// Describes the detector.
    pub fn info(&self) -> DetectorInfo {
        let categories = self
            .patterns
            .catalog()
            .categories()
            .iter()
            .map(|c| c.category())
            .collect();

        let model = self.model.as_ref().map(|handle| {
            let status = handle.status();
            ModelInfo {
                status: status.as_str(),
                error: match status {
                    ModelStatus::Failed(reason) => Some(reason),
                    _ => None,
                },
                model_path: self.config.model.model_path.display().to_string(),
                tokenizer_path: self.config.model.tokenizer_path.display().to_string(),
                labels: TokenLabel::ALL.iter().map(TokenLabel::tag).collect(),
                max_length: self.config.model.max_length,
                threshold: self.config.model.threshold,
            }
        });

        DetectorInfo {
            strategy: self.config.strategy,
            ready: self.is_ready(),
            categories,
            pattern_count: self.patterns.catalog().pattern_count(),
            profane_threshold: self.config.profane_threshold,
            context_threshold: self.config.context_threshold,
            fallback_to_patterns: self.config.fallback_to_patterns,
            model,
        }
    }
}

/// Summary of a detector's setup.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorInfo {
    pub strategy: Strategy,
    pub ready: bool,
    pub categories: Vec<Category>,
    pub pattern_count: usize,
    pub profane_threshold: f32,
    pub context_threshold: f32,
    pub fallback_to_patterns: bool,
    /// Present under the model strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
}

/// Token classifier part of [`DetectorInfo`].
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// "loading", "ready" or "error".
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub model_path: String,
    pub tokenizer_path: String,
    pub labels: Vec<&'static str>,
    pub max_length: usize,
    pub threshold: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ModelError, Span, TokenPrediction};
    use serde_json::json;

    fn detector() -> ProfanityDetector {
        ProfanityDetector::pattern_only().unwrap()
    }

    /// Flags every byte of the text as one toxic token.
    struct WholeTextModel;

    impl TokenInference for WholeTextModel {
        fn predict(&mut self, text: &str) -> std::result::Result<Vec<TokenPrediction>, ModelError> {
            Ok(vec![TokenPrediction {
                label: TokenLabel::BeginToxic,
                probability: 0.99,
                offsets: Some((0, text.len())),
            }])
        }

        fn name(&self) -> &'static str {
            "whole-text"
        }
    }

    struct PanickingModel;

    impl TokenInference for PanickingModel {
        fn predict(&mut self, _text: &str) -> std::result::Result<Vec<TokenPrediction>, ModelError> {
            panic!("tensor shape mismatch");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn model_config(fallback_to_patterns: bool) -> DetectorConfig {
        DetectorConfig {
            strategy: Strategy::Model,
            fallback_to_patterns,
            ..Default::default()
        }
    }

    fn failed_model() -> ModelHandle {
        ModelHandle::spawn(0.7, || {
            Err(ModelError::ModelNotFound("models/phobert.onnx".to_string()))
        })
    }

    #[test]
    fn empty_input_is_clean() {
        for text in ["", "   ", "\n\t"] {
            let result = detector().detect(text);
            assert!(!result.is_profane);
            assert_eq!(result.confidence, 0.0);
            assert!(result.toxic_spans.is_empty());
            assert!(result.error.is_none());
        }
    }

    #[test]
    fn samples_split_clean_and_profane() {
        let detector = detector();
        let verdicts: Vec<bool> = SAMPLE_TEXTS
            .iter()
            .map(|text| detector.detect(text).is_profane)
            .collect();
        assert_eq!(verdicts, vec![false, false, true, true, true, false]);
    }

    #[test]
    fn known_examples() {
        let detector = detector();

        let result = detector.detect("Thằng ngu này không biết gì cả");
        assert!(result.is_profane);
        assert!(result.confidence >= 0.85);
        assert!(result.has_category(Category::Contextual));
        assert!(!result.toxic_spans.is_empty());

        let result = detector.detect("Đm, tại sao lại thế này?");
        assert!(result.is_profane);
        assert!(result.confidence >= 0.90);
        assert!(result.has_category(Category::Explicit));
    }

    #[test]
    fn context_alone_promotes() {
        let result = detector().detect("ĐI NGAY ĐÂY!!");
        assert!(result.is_profane);
        assert!(result.toxic_spans.is_empty());
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn confidence_is_always_in_range() {
        let detector = detector();
        let texts = [
            "a",
            "!!!!!!!!",
            "ĐM VCL CHẾT ĐI!!! TAO SẼ giết chết mày, ĐỪNG CÓ chạy",
            "0123456789@#*+",
            "Xin chào thế giới",
            "ngu ngu ngu ngu",
        ];
        for text in texts {
            let result = detector.detect(text);
            assert!((0.0..=1.0).contains(&result.confidence), "{text}");
            for pair in result.toxic_spans.windows(2) {
                assert!(pair[0].end < pair[1].start, "{text}");
            }
        }
    }

    #[test]
    fn non_string_input_is_rejected() {
        let detector = detector();
        for value in [json!(42), json!(null), json!(["đm"]), json!({"text": "đm"})] {
            let result = detector.detect_value(&value);
            assert!(!result.is_profane);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.error.as_deref(), Some(NOT_A_STRING));
        }
        assert!(detector.detect_value(&json!("đm")).is_profane);
    }

    #[test]
    fn request_body_needs_text_field() {
        let detector = detector();

        let result = detector.detect_request(&json!({"content": "đm"}));
        assert_eq!(result.error.as_deref(), Some(MISSING_TEXT));

        let result = detector.detect_request(&json!({"text": 7}));
        assert_eq!(result.error.as_deref(), Some(NOT_A_STRING));

        let result = detector.detect_request(&json!({"text": "Mày ngu quá đi"}));
        assert!(result.is_profane);
        assert!(result.error.is_none());
    }

    #[test]
    fn result_serializes_to_wire_shape() {
        let result = detector().detect("Đm, tại sao lại thế này?");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["is_profane"], json!(true));
        assert_eq!(value["toxic_spans"], json!([[0, 2]]));
        assert_eq!(value["processed_text"], json!("Đm, tại sao lại thế này?"));
        assert_eq!(value["detected_categories"], json!(["explicit"]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn model_strategy_answers_through_the_model() {
        let handle = ModelHandle::ready(0.7, Box::new(WholeTextModel));
        let detector = ProfanityDetector::with_model(model_config(false), handle).unwrap();
        assert!(detector.is_ready());

        let result = detector.detect("  xin chào  ");
        assert!(result.is_profane);
        assert_eq!(result.toxic_spans, vec![Span::new(0, 8)]);
        assert_eq!(result.detected_categories, None);
    }

    #[tokio::test]
    async fn failed_model_degrades_to_negative_results() {
        let detector = ProfanityDetector::with_model(model_config(false), failed_model()).unwrap();
        assert!(matches!(detector.wait_ready().await, ModelStatus::Failed(_)));
        assert!(!detector.is_ready());

        let result = detector.detect("Đm, tại sao lại thế này?");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.unwrap().contains("models/phobert.onnx"));
    }

    #[tokio::test]
    async fn fallback_answers_with_patterns() {
        let detector = ProfanityDetector::with_model(model_config(true), failed_model()).unwrap();
        detector.wait_ready().await;

        let result = detector.detect("Đm, tại sao lại thế này?");
        assert!(result.is_profane);
        assert!(result.has_category(Category::Explicit));
        assert!(result.error.unwrap().contains("failed to load"));
    }

    #[test]
    fn pipeline_panics_become_results() {
        let handle = ModelHandle::ready(0.7, Box::new(PanickingModel));
        let detector = ProfanityDetector::with_model(model_config(false), handle).unwrap();

        let result = detector.detect(" đm ");
        assert!(!result.is_profane);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.processed_text, "đm");
        let error = result.error.unwrap();
        assert!(error.starts_with("detection failed:"));
        assert!(error.contains("tensor shape mismatch"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DetectorConfig {
            context_threshold: -0.1,
            ..Default::default()
        };
        assert!(ProfanityDetector::new(config).is_err());
    }

    #[test]
    fn info_describes_pattern_detector() {
        let info = detector().info();
        assert_eq!(info.strategy, Strategy::Pattern);
        assert!(info.ready);
        assert_eq!(info.categories, Category::all().to_vec());
        assert_eq!(info.pattern_count, 19);
        assert!(info.model.is_none());

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["strategy"], json!("pattern"));
        assert!(value.get("model").is_none());
    }

    #[tokio::test]
    async fn info_reports_model_status() {
        let detector = ProfanityDetector::with_model(model_config(false), failed_model()).unwrap();
        detector.wait_ready().await;

        let info = detector.info();
        let model = info.model.unwrap();
        assert_eq!(model.status, "error");
        assert!(model.error.is_some());
        assert_eq!(model.labels, vec!["O", "B-T", "I-T"]);
        assert_eq!(model.max_length, 128);
    }

    #[cfg(not(feature = "ml"))]
    #[tokio::test]
    async fn model_strategy_without_ml_feature_reports_it() {
        let detector = ProfanityDetector::new(model_config(false)).unwrap();
        detector.wait_ready().await;
        let result = detector.detect("đm");
        assert!(!result.is_profane);
        assert!(result.error.unwrap().contains("ML feature not enabled"));
    }

    #[test]
    fn detector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProfanityDetector>();
    }
}
