//! Fits the preprocessor and the forest, scores the holdout and persists both.
//!
//! [`Trainer::train`] always runs the same steps in the same order:
//!
//! 1. separate the `species` label from the model input columns
//! 2. stratified split on the label with the configured test size and seed
//! 3. build the preprocessor on the training partition only
//! 4. transform both partitions with it
//! 5. fit the random forest on the transformed training partition
//! 6. score accuracy on the transformed validation partition
//! 7. persist the preprocessor and the model
//!
//! The validation rows never reach [`Preprocessor::build`].

use crate::config::PipelineConfig;
use crate::error::{LearningError, Result};
use crate::forest::RandomForestModel;
use crate::split::{StratifiedSplit, take_rows};
use crate::types::TrainingOutcome;
use penguin_processing::utils::string_values;
use penguin_processing::{
    LABEL_COLUMN, Preprocessor, ProcessingError, ValidationError, model_input_columns,
};
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// Split a feature-engineered table into model inputs and labels.
///
/// Only the columns the model reads are kept, so extra input columns are ignored.
pub fn features_and_labels(df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
    for name in std::iter::once(LABEL_COLUMN).chain(model_input_columns()) {
        if df.column(name).is_err() {
            let missing = ValidationError::MissingColumn(name.to_string());
            return Err(ProcessingError::from(missing).into());
        }
    }

    let labels = string_values(df, LABEL_COLUMN)?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label.ok_or_else(|| {
                LearningError::TrainingFailed(format!("label missing at row {row}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let features = df.select(model_input_columns())?;
    Ok((features, labels))
}

/// Runs the fixed training sequence for one [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct Trainer {
    config: PipelineConfig,
}

impl Trainer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Train on a validated, feature-engineered table.
    pub fn train(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        info!("Starting model training on {} rows", df.height());

        // 1
        let (features, labels) = features_and_labels(df)?;

        // 2
        let split = StratifiedSplit::new(&labels, self.config.test_size, self.config.random_seed);
        if split.train.is_empty() || split.validation.is_empty() {
            return Err(LearningError::TrainingFailed(format!(
                "cannot split {} rows into non-empty train and validation partitions",
                labels.len()
            )));
        }
        let x_train = take_rows(&features, &split.train)?;
        let x_val = take_rows(&features, &split.validation)?;
        let y_train: Vec<String> = split.train.iter().map(|&r| labels[r].clone()).collect();
        let y_val: Vec<String> = split.validation.iter().map(|&r| labels[r].clone()).collect();
        info!(
            "Split: {} training rows, {} validation rows",
            split.train.len(),
            split.validation.len()
        );

        // 3
        let preprocessor = Preprocessor::build(&x_train)?;

        // 4
        let train_rows = preprocessor.to_matrix(&x_train)?;
        let val_rows = preprocessor.to_matrix(&x_val)?;
        debug!(
            "Transformed features: {} columns",
            preprocessor.output_columns().len()
        );

        // 5
        let model = RandomForestModel::fit(
            &self.config.forest_params(),
            preprocessor.output_columns(),
            &train_rows,
            &y_train,
        )?;

        // 6
        let predicted = model.predict(&val_rows)?;
        let correct = predicted.iter().zip(&y_val).filter(|(p, t)| p == t).count();
        let accuracy = correct as f64 / y_val.len() as f64;
        info!("Accuracy: {:.4}", accuracy);

        // 7
        preprocessor.save(&self.config.preprocessor_path)?;
        model.save(&self.config.model_path)?;

        Ok(TrainingOutcome {
            accuracy,
            train_rows: split.train.len(),
            validation_rows: split.validation.len(),
            classes: model.classes().to_vec(),
            model_path: self.config.model_path.clone(),
            preprocessor_path: self.config.preprocessor_path.clone(),
        })
    }
}
