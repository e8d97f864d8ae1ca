//! Error types for dataset handling.
//!
//! [`ProcessingError`] covers everything that can go wrong between reading a CSV
//! and producing the numeric feature table the classifier consumes. Schema rule
//! violations are reported through the nested [`ValidationError`] so callers can
//! tell exactly which rule fired and on which columns.

use thiserror::Error;

/// A violated dataset rule. Produced by [`crate::validation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A required column exists but has the wrong declared type.
    #[error("Column {column} has dtype {actual}, expected {expected}")]
    WrongDtype {
        column: String,
        actual: String,
        expected: String,
    },

    /// One or more required columns contain nulls.
    #[error("Null values found in columns: {0:?}")]
    NullValues(Vec<String>),

    /// A column that must be strictly positive has zero or negative values.
    #[error("Found {count} non-positive {column} values")]
    NonPositive { column: String, count: usize },
}

impl ValidationError {
    /// Columns named by this violation.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::MissingColumn(column) => vec![column.as_str()],
            Self::WrongDtype { column, .. } | Self::NonPositive { column, .. } => {
                vec![column.as_str()]
            }
            Self::NullValues(columns) => columns.iter().map(String::as_str).collect(),
        }
    }
}

/// The main error type for the processing crate.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The dataset failed schema, null or range validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Derived features could not be computed.
    #[error("Feature engineering failed: {source}")]
    FeatureEngineering {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Building or applying the column transformation failed.
    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    /// A persisted preprocessor was not found on disk.
    #[error("Preprocessor artifact not found: {path}")]
    ArtifactNotFound { path: String },

    /// A persisted preprocessor could not be decoded.
    #[error("Preprocessor artifact '{path}' is unreadable: {reason}")]
    ArtifactCorrupt { path: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Wrap any error as a feature-engineering failure.
    pub fn feature_engineering(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ProcessingError::FeatureEngineering {
            source: source.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in logs and serialized errors.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::FeatureEngineering { .. } => "FEATURE_ENGINEERING_FAILED",
            Self::Preprocessing(_) => "PREPROCESSING_FAILED",
            Self::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
            Self::ArtifactCorrupt { .. } => "ARTIFACT_CORRUPT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The validation rule that fired, looking through context wrappers.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(rule) => Some(rule),
            Self::WithContext { source, .. } => source.validation(),
            _ => None,
        }
    }

    /// Check if this error means a persisted artifact is missing or unreadable.
    pub fn is_artifact_error(&self) -> bool {
        match self {
            Self::ArtifactNotFound { .. } | Self::ArtifactCorrupt { .. } => true,
            Self::WithContext { source, .. } => source.is_artifact_error(),
            _ => false,
        }
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = ProcessingError::Validation(ValidationError::MissingColumn("sex".to_string()));
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(
            ProcessingError::Preprocessing("empty".to_string()).error_code(),
            "PREPROCESSING_FAILED"
        );
    }

    #[test]
    fn test_validation_columns() {
        let rule = ValidationError::NullValues(vec!["island".to_string(), "sex".to_string()]);
        assert_eq!(rule.columns(), vec!["island", "sex"]);
        assert!(rule.to_string().contains("island"));
    }

    #[test]
    fn test_feature_engineering_keeps_cause() {
        let err = ProcessingError::feature_engineering("column 'bill_depth_mm' not found");
        assert_eq!(err.error_code(), "FEATURE_ENGINEERING_FAILED");
        let source = std::error::Error::source(&err).expect("cause attached");
        assert!(source.to_string().contains("bill_depth_mm"));
    }

    #[test]
    fn test_with_context_preserves_code_and_rule() {
        let err = ProcessingError::Validation(ValidationError::MissingColumn("island".to_string()))
            .with_context("During training");
        assert!(err.to_string().contains("During training"));
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(
            err.validation(),
            Some(&ValidationError::MissingColumn("island".to_string()))
        );
    }

    #[test]
    fn test_artifact_classification() {
        let err = ProcessingError::ArtifactNotFound {
            path: "models/preprocessor.json".to_string(),
        };
        assert!(err.is_artifact_error());
        assert!(!ProcessingError::Preprocessing("x".to_string()).is_artifact_error());
    }
}
