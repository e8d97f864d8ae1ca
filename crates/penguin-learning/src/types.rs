//! Result types returned by the pipeline stages.
//!
//! - [`TrainingOutcome`]: returned by [`Trainer::train()`](crate::Trainer::train)
//! - [`InferenceOutcome`]: returned by [`run_infer()`](crate::pipeline::run_infer)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// Accuracy on the validation partition, in `[0, 1]`.
    pub accuracy: f64,

    /// Rows used to build the preprocessor and fit the forest.
    pub train_rows: usize,

    /// Held-out rows scored for `accuracy`.
    pub validation_rows: usize,

    /// Sorted class labels the model can predict.
    pub classes: Vec<String>,

    /// Where the fitted model was written.
    pub model_path: PathBuf,

    /// Where the fitted preprocessor was written.
    pub preprocessor_path: PathBuf,
}

/// Result of a batch inference run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    /// Number of rows predicted.
    pub rows: usize,

    /// CSV with the input columns and `predicted_species`.
    pub output_path: PathBuf,
}
