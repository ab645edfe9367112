//! Background loading of the token classifier.
//!
//! The model loads once, off the caller's thread. Callers poll
//! [`ModelHandle::is_ready`] or await [`ModelHandle::wait_ready`]; inference
//! requests made before the load finishes get a negative result that says
//! why, and never wait on the load.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::token::{decode_predictions, ModelError, TokenInference};
use super::DetectionResult;

/// Load state of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// The load task is still running.
    Loading,
    /// The model is loaded and serving.
    Ready,
    /// The load failed; the reason is kept for every later request.
    Failed(String),
}

impl ModelStatus {
    /// Short lowercase name for status reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Loading => "loading",
            ModelStatus::Ready => "ready",
            ModelStatus::Failed(_) => "error",
        }
    }
}

type SharedModel = Arc<OnceLock<Mutex<Box<dyn TokenInference>>>>;

/// Handle to a model that may still be loading.
#[derive(Clone)]
pub struct ModelHandle {
    status: watch::Receiver<ModelStatus>,
    model: SharedModel,
    threshold: f32,
}

impl ModelHandle {
    /// Starts loading and returns immediately.
    ///
    /// Inside a tokio runtime the load runs on its blocking pool, otherwise
    /// on a dedicated thread.
    pub fn spawn<F>(threshold: f32, loader: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn TokenInference>, ModelError> + Send + 'static,
    {
        let (tx, rx) = watch::channel(ModelStatus::Loading);
        let model: SharedModel = Arc::new(OnceLock::new());
        let slot = Arc::clone(&model);

        let load = move || {
            let start = Instant::now();
            info!("Loading token classifier model...");
            let loaded = panic::catch_unwind(AssertUnwindSafe(loader)).unwrap_or_else(|payload| {
                Err(ModelError::Runtime(format!(
                    "model loader panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
            let status = match loaded {
                Ok(loaded) => {
                    info!(
                        model = loaded.name(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Token classifier model loaded"
                    );
                    let _ = slot.set(Mutex::new(loaded));
                    ModelStatus::Ready
                }
                Err(e) => {
                    error!(error = %e, "Failed to load token classifier model");
                    ModelStatus::Failed(e.to_string())
                }
            };
            // Receivers may all be gone; the status is then unobserved.
            let _ = tx.send(status);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let _ = runtime.spawn_blocking(load);
            }
            Err(_) => {
                let _ = std::thread::spawn(load);
            }
        }

        Self {
            status: rx,
            model,
            threshold,
        }
    }

    /// Wraps an already loaded model.
    pub fn ready(threshold: f32, model: Box<dyn TokenInference>) -> Self {
        let (_tx, rx) = watch::channel(ModelStatus::Ready);
        let slot = OnceLock::new();
        let _ = slot.set(Mutex::new(model));
        Self {
            status: rx,
            model: Arc::new(slot),
            threshold,
        }
    }

    /// Returns true once the model has loaded.
    pub fn is_ready(&self) -> bool {
        matches!(*self.status.borrow(), ModelStatus::Ready)
    }

    /// Current load state.
    pub fn status(&self) -> ModelStatus {
        self.status.borrow().clone()
    }

    /// Waits until loading has finished, successfully or not.
    pub async fn wait_ready(&self) -> ModelStatus {
        let mut rx = self.status.clone();
        let finished = rx
            .wait_for(|s| *s != ModelStatus::Loading)
            .await
            .map(|status| status.clone());
        match finished {
            Ok(status) => status,
            // The load task ended without reporting (it panicked).
            Err(_) => ModelStatus::Failed("model load task ended unexpectedly".to_string()),
        }
    }

    /// Classifies `text` with the model, or explains why it cannot.
    pub fn infer(&self, text: &str) -> DetectionResult {
        let processed_text = text.trim();
        match self.try_infer(processed_text) {
            Ok(result) => result,
            Err(e) => {
                if !matches!(e, ModelError::Loading) {
                    warn!(error = %e, "Token classification unavailable");
                }
                DetectionResult::failed(processed_text, e.to_string())
            }
        }
    }

    fn try_infer(&self, text: &str) -> Result<DetectionResult, ModelError> {
        let status = self.status();
        let model = match (&status, self.model.get()) {
            (ModelStatus::Ready, Some(model)) => model,
            (ModelStatus::Failed(reason), _) => {
                return Err(ModelError::Unavailable(reason.clone()))
            }
            _ => return Err(ModelError::Loading),
        };

        if text.is_empty() {
            return Ok(DetectionResult::clean(""));
        }

        // A panic in an earlier `predict` leaves the lock poisoned.
        let mut model = model.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering token classifier after a panicked request");
            model.clear_poison();
            poisoned.into_inner()
        });
        let predictions = model.predict(text)?;
        Ok(decode_predictions(text, &predictions, self.threshold))
    }
}

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("status", &self.status())
            .field("threshold", &self.threshold)
            .finish()
    }
}
