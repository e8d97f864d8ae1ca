//! Error types for the penguin-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Error Handling
//!
//! Errors raised while loading, validating or transforming data come from
//! `penguin-processing` and are carried unchanged in
//! [`Processing`](LearningError::Processing). Everything specific to fitting,
//! persisting and running the classifier has its own variant.
//!
//! Persisted-state failures (a missing or unreadable model or preprocessor)
//! are grouped by [`LearningError::is_artifact_error`], so a caller can tell
//! "run training first" apart from a bad input file.
//!
//! # Example
//!
//! ```no_run
//! use penguin_learning::{LearningError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = PipelineConfig::builder().test_size(0.25).build()?;
//!     Ok(config)
//! }
//! ```

use crate::config::ConfigValidationError;
use penguin_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for penguin-learning operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Loading, validation, feature engineering or preprocessing failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Invalid configuration provided to the pipeline.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fitting the classifier failed.
    ///
    /// Common causes:
    /// - The training partition has fewer than two classes
    /// - The training partition is empty
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The persisted model was not found.
    ///
    /// Run training first, or point `--model-path` at an existing artifact.
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path that was not found.
        path: String,
    },

    /// The persisted model exists but cannot be decoded.
    #[error("Model artifact '{path}' is unreadable: {reason}")]
    ArtifactCorrupt { path: String, reason: String },

    /// An error occurred during prediction.
    ///
    /// Typically the feature layout handed to the model does not match the one it
    /// was trained on.
    #[error("Inference error: {0}")]
    Inference(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rendering or encoding the confusion-matrix image failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LearningError {
    /// Stable error code, used in logs and serialized errors.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Processing(e) => e.error_code(),
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::ArtifactCorrupt { .. } => "ARTIFACT_CORRUPT",
            Self::Inference(_) => "INFERENCE_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Image(_) => "IMAGE_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }

    /// Check if this error means a persisted model or preprocessor is missing or
    /// unreadable.
    pub fn is_artifact_error(&self) -> bool {
        match self {
            Self::ModelNotFound { .. } | Self::ArtifactCorrupt { .. } => true,
            Self::Processing(e) => e.is_artifact_error(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for LearningError {
    fn from(err: ConfigValidationError) -> Self {
        LearningError::InvalidConfig(err.to_string())
    }
}

/// Errors serialize as `{ code, message }`.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
