//! The three runnable modes: train, eval and infer.
//!
//! Each function takes the full [`PipelineConfig`] and does its own loading,
//! so the CLI only has to pick one.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::evaluator::{ClassificationReport, Evaluator};
use crate::inference::InferenceRunner;
use crate::split::{StratifiedSplit, take_rows};
use crate::trainer::{Trainer, features_and_labels};
use crate::types::{InferenceOutcome, TrainingOutcome};
use penguin_processing::{
    FittedPreprocessor, engineer_features, load_dataset, validate, write_csv, write_sample,
};
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

/// Rows written by the optional quick-look sample.
const SAMPLE_ROWS: usize = 5;

/// Load, validate and feature-engineer the labeled dataset.
fn load_labeled(config: &PipelineConfig) -> Result<DataFrame> {
    let df = load_dataset(&config.data_path)?;
    if let Some(sample_path) = &config.sample_path {
        write_sample(&df, sample_path, SAMPLE_ROWS)?;
    }
    let df = validate(df)?;
    Ok(engineer_features(&df)?)
}

/// Train and persist the preprocessor and model.
pub fn run_train(config: &PipelineConfig) -> Result<TrainingOutcome> {
    info!("Running training pipeline...");
    let df = load_labeled(config)?;
    let outcome = Trainer::new(config.clone()).train(&df)?;
    info!("Training completed with accuracy: {:.4}", outcome.accuracy);
    Ok(outcome)
}

/// Evaluate the persisted model on the held-out partition.
///
/// The split is recomputed with the configured test size and seed, so with
/// the settings used for training this is exactly the validation partition.
pub fn run_eval(config: &PipelineConfig) -> Result<ClassificationReport> {
    info!("Running evaluation pipeline...");
    let df = load_labeled(config)?;
    let (features, labels) = features_and_labels(&df)?;

    let split = StratifiedSplit::new(&labels, config.test_size, config.random_seed);
    let holdout = take_rows(&features, &split.validation)?;
    let holdout_labels: Vec<String> = split.validation.iter().map(|&r| labels[r].clone()).collect();

    let preprocessor = FittedPreprocessor::load(&config.preprocessor_path)?;
    let transformed = preprocessor.apply(&holdout)?;

    Evaluator::new(&config.report_dir).evaluate(&config.model_path, &transformed, &holdout_labels)
}

/// Predict every row of `input` and write the predictions CSV.
pub fn run_infer(config: &PipelineConfig, input: impl AsRef<Path>) -> Result<InferenceOutcome> {
    info!("Running inference pipeline...");
    let raw = load_dataset(input)?;
    let runner = InferenceRunner::load(&config.preprocessor_path, &config.model_path)?;

    let predicted = runner.predict_frame(&raw)?;
    write_csv(&predicted, &config.predictions_path)?;
    info!(
        "Saved inference results to {}",
        config.predictions_path.display()
    );

    Ok(InferenceOutcome {
        rows: predicted.height(),
        output_path: config.predictions_path.clone(),
    })
}
