//! Configuration for training, evaluation and inference runs.
//!
//! [`PipelineConfig`] is passed explicitly into every component; there is no
//! process-wide state. Paths default to the conventional project layout.
//!
//! # Example
//!
//! ```
//! use penguin_learning::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .test_size(0.25)
//!     .random_seed(7)
//!     .n_trees(50)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.n_trees, 50);
//! ```

use crate::forest::RandomForestParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "data/raw/penguins_cleaned.csv";
pub const DEFAULT_MODEL_PATH: &str = "models/model.json";
pub const DEFAULT_PREPROCESSOR_PATH: &str = "models/preprocessor.json";
pub const DEFAULT_REPORT_DIR: &str = "reports/metrics";
pub const DEFAULT_PREDICTIONS_PATH: &str = "data/processed/inference_output.csv";

/// Configuration for the classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Labeled dataset used by training and evaluation.
    /// Default: "data/raw/penguins_cleaned.csv"
    pub data_path: PathBuf,

    /// Where the fitted classifier is written and read.
    /// Default: "models/model.json"
    pub model_path: PathBuf,

    /// Where the fitted preprocessor is written and read.
    /// Default: "models/preprocessor.json"
    pub preprocessor_path: PathBuf,

    /// Output directory for the classification report and confusion matrix.
    /// Default: "reports/metrics"
    pub report_dir: PathBuf,

    /// Output CSV for batch inference.
    /// Default: "data/processed/inference_output.csv"
    pub predictions_path: PathBuf,

    /// If set, training writes the first rows of the loaded data here.
    /// Default: None
    pub sample_path: Option<PathBuf>,

    /// Fraction of each class held out for validation, in (0, 1).
    /// Default: 0.2
    pub test_size: f64,

    /// Seed for the split and for bagging.
    /// Default: 42
    pub random_seed: u64,

    /// Number of trees in the forest.
    /// Default: 100
    pub n_trees: usize,

    /// Maximum tree depth, unlimited when None.
    /// Default: None
    pub max_depth: Option<usize>,

    /// Minimum number of rows in a leaf.
    /// Default: 1
    pub min_samples_leaf: usize,

    /// Columns each tree sees. None means the square root of the feature count.
    /// Default: None
    pub max_features: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            preprocessor_path: PathBuf::from(DEFAULT_PREPROCESSOR_PATH),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            predictions_path: PathBuf::from(DEFAULT_PREDICTIONS_PATH),
            sample_path: None,
            test_size: 0.2,
            random_seed: 42,
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidTestSize(self.test_size));
        }

        if self.n_trees == 0 {
            return Err(ConfigValidationError::InvalidTreeCount);
        }

        if self.max_depth == Some(0) {
            return Err(ConfigValidationError::ZeroValue("max_depth"));
        }

        if self.min_samples_leaf == 0 {
            return Err(ConfigValidationError::ZeroValue("min_samples_leaf"));
        }

        if self.max_features == Some(0) {
            return Err(ConfigValidationError::ZeroValue("max_features"));
        }

        Ok(())
    }

    /// Forest hyperparameters carried by this configuration.
    pub fn forest_params(&self) -> RandomForestParams {
        RandomForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            random_seed: self.random_seed,
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("Invalid test_size: {0} (must be between 0.0 and 1.0, exclusive)")]
    InvalidTestSize(f64),

    #[error("Invalid n_trees: must be at least 1")]
    InvalidTreeCount,

    #[error("Invalid {0}: must be at least 1")]
    ZeroValue(&'static str),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    preprocessor_path: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    predictions_path: Option<PathBuf>,
    sample_path: Option<PathBuf>,
    test_size: Option<f64>,
    random_seed: Option<u64>,
    n_trees: Option<usize>,
    max_depth: Option<usize>,
    min_samples_leaf: Option<usize>,
    max_features: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Set the labeled dataset path.
    #[must_use]
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Set the model artifact path.
    #[must_use]
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Set the preprocessor artifact path.
    #[must_use]
    pub fn preprocessor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preprocessor_path = Some(path.into());
        self
    }

    /// Set the directory for evaluation outputs.
    #[must_use]
    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    /// Set the predictions CSV path.
    #[must_use]
    pub fn predictions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.predictions_path = Some(path.into());
        self
    }

    /// Write a head sample of the training data to `path`.
    #[must_use]
    pub fn sample_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sample_path = Some(path.into());
        self
    }

    /// Set the held-out fraction per class.
    ///
    /// [`build()`](Self::build) returns an error unless `0.0 < size < 1.0`.
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.test_size = Some(size);
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the number of trees.
    #[must_use]
    pub fn n_trees(mut self, n: usize) -> Self {
        self.n_trees = Some(n);
        self
    }

    /// Limit tree depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the minimum number of rows per leaf.
    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = Some(n);
        self
    }

    /// Set the number of columns each tree sees.
    #[must_use]
    pub fn max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n);
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            data_path: self.data_path.unwrap_or(defaults.data_path),
            model_path: self.model_path.unwrap_or(defaults.model_path),
            preprocessor_path: self.preprocessor_path.unwrap_or(defaults.preprocessor_path),
            report_dir: self.report_dir.unwrap_or(defaults.report_dir),
            predictions_path: self.predictions_path.unwrap_or(defaults.predictions_path),
            sample_path: self.sample_path,
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            n_trees: self.n_trees.unwrap_or(defaults.n_trees),
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf.unwrap_or(defaults.min_samples_leaf),
            max_features: self.max_features,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.model_path, PathBuf::from("models/model.json"));
        assert_eq!(config.report_dir, PathBuf::from("reports/metrics"));
        assert!(config.sample_path.is_none());
    }

    #[test]
    fn test_builder_defaults_match_default() {
        assert_eq!(PipelineConfig::builder().build().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .data_path("train.csv")
            .test_size(0.3)
            .random_seed(1)
            .n_trees(10)
            .max_depth(4)
            .build()
            .unwrap();

        assert_eq!(config.data_path, PathBuf::from("train.csv"));
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.max_depth, Some(4));

        let params = config.forest_params();
        assert_eq!(params.n_trees, 10);
        assert_eq!(params.random_seed, 1);
    }

    #[test]
    fn test_invalid_test_size() {
        for size in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let result = PipelineConfig::builder().test_size(size).build();
            assert!(
                matches!(result, Err(ConfigValidationError::InvalidTestSize(_))),
                "test_size {size} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_trees_rejected() {
        assert_eq!(
            PipelineConfig::builder().n_trees(0).build().unwrap_err(),
            ConfigValidationError::InvalidTreeCount
        );
    }

    #[test]
    fn test_zero_depth_and_leaf_rejected() {
        let err = PipelineConfig::builder().max_depth(0).build().unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let err = PipelineConfig::builder().min_samples_leaf(0).build().unwrap_err();
        assert!(err.to_string().contains("min_samples_leaf"));
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::builder()
            .sample_path("data/processed/sample.csv")
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
