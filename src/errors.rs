//! Error types for AgriDoctor
//!
//! One error enum covers the whole detection pipeline. Degraded metadata is
//! not an error and never shows up here.

use thiserror::Error;

/// Main error type for the detection pipeline
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Image could not be read, decoded or converted to RGB
    #[error("Invalid image '{image}': {reason}")]
    InputError { image: String, reason: String },

    /// No classifier is installed
    #[error("Classification model is not loaded")]
    ModelUnavailable,

    /// Model artifact failed to load at startup
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// Inference produced an unusable output
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Tensor runtime errors
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// A table or model disagrees with the declared class count
    #[error("{table} has {actual} entries but the model declares {expected} classes")]
    AlignmentMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// Label lookup failed
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Batch exceeds the configured limit
    #[error("Batch of {count} images exceeds the maximum of {max}")]
    BatchTooLarge { count: usize, max: usize },

    /// Persistence collaborator errors
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("Detection error: {0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DetectionError>;

impl DetectionError {
    /// Build an input error for the named image
    pub fn input(image: impl Into<String>, reason: impl ToString) -> Self {
        DetectionError::InputError {
            image: image.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that repeat on every call until a model is installed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DetectionError::ModelUnavailable | DetectionError::ModelLoad { .. }
        )
    }
}

/// Convert anyhow errors to DetectionError
impl From<anyhow::Error> for DetectionError {
    fn from(err: anyhow::Error) -> Self {
        DetectionError::Generic(err.to_string())
    }
}
