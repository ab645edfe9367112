//! Crate-level error type.

use thiserror::Error;

use crate::classifier::{CatalogError, ModelError};
use crate::config::ConfigError;

/// Errors that can occur while building a detector.
#[derive(Debug, Error)]
pub enum VnFilterError {
    /// A detection rule failed to compile.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The token classifier could not be used.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Result type for detector construction.
pub type Result<T> = std::result::Result<T, VnFilterError>;
