//! # penguin-learning
//!
//! Random forest training, evaluation and batch inference for penguin species,
//! on top of the datasets and fitted preprocessor from `penguin-processing`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use penguin_learning::{PipelineConfig, run_eval, run_infer, run_train};
//!
//! let config = PipelineConfig::builder()
//!     .data_path("data/raw/penguins_cleaned.csv")
//!     .n_trees(100)
//!     .build()?;
//!
//! let outcome = run_train(&config)?;
//! println!("Validation accuracy: {:.4}", outcome.accuracy);
//!
//! let report = run_eval(&config)?;
//! println!("Macro F1: {:.4}", report.macro_avg.f1_score);
//!
//! run_infer(&config, "data/new_penguins.csv")?;
//! ```
//!
//! ## Components
//!
//! | Stage | Type | Reads | Writes |
//! |-------|------|-------|--------|
//! | train | [`Trainer`] | labeled CSV | preprocessor, model |
//! | eval | [`Evaluator`] | labeled CSV, preprocessor, model | report JSON, confusion matrix PNG |
//! | infer | [`InferenceRunner`] | unlabeled CSV, preprocessor, model | predictions CSV |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, LearningError>`](LearningError). Use
//! [`LearningError::is_artifact_error`] to detect missing or unreadable
//! persisted state.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod forest;
pub mod inference;
pub mod pipeline;
pub mod split;
pub mod trainer;
pub mod types;

pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{LearningError, Result as LearningResult};
pub use evaluator::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, EvaluationArtifacts, Evaluator,
};
pub use forest::{RandomForestModel, RandomForestParams};
pub use inference::InferenceRunner;
pub use pipeline::{run_eval, run_infer, run_train};
pub use split::StratifiedSplit;
pub use trainer::Trainer;
pub use types::{InferenceOutcome, TrainingOutcome};
