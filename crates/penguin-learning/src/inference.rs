//! Batch inference with persisted artifacts.
//!
//! [`InferenceRunner`] holds a [`FittedPreprocessor`] and a
//! [`RandomForestModel`]; it has no way to refit either. Each call recomputes the
//! derived features, applies the stored transformation and predicts.

use crate::error::{LearningError, Result};
use crate::forest::RandomForestModel;
use penguin_processing::{FittedPreprocessor, PREDICTION_COLUMN, engineer_features};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Persisted preprocessor and model, ready to predict.
#[derive(Debug, Clone)]
pub struct InferenceRunner {
    preprocessor: FittedPreprocessor,
    model: RandomForestModel,
}

impl InferenceRunner {
    /// Load both artifacts. Either one missing or unreadable is fatal.
    pub fn load(
        preprocessor_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let preprocessor = FittedPreprocessor::load(preprocessor_path)?;
        let model = RandomForestModel::load(model_path)?;
        Self::from_parts(preprocessor, model)
    }

    /// Pair an in-memory preprocessor and model.
    ///
    /// # Errors
    ///
    /// [`LearningError::Inference`] if the model was trained on a different
    /// feature layout than the preprocessor produces.
    pub fn from_parts(preprocessor: FittedPreprocessor, model: RandomForestModel) -> Result<Self> {
        if preprocessor.output_columns() != model.feature_names() {
            return Err(LearningError::Inference(format!(
                "preprocessor produces {} columns but the model expects {}",
                preprocessor.output_columns().len(),
                model.feature_names().len()
            )));
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    /// One predicted label per row of `raw`, in row order.
    ///
    /// `raw` needs the measurement columns; a label column, if present, is
    /// ignored. Missing measurement columns surface as the feature-engineering
    /// error.
    pub fn predict(&self, raw: &DataFrame) -> Result<Vec<String>> {
        info!("Running inference on {} rows", raw.height());
        let features = engineer_features(raw)?;
        let transformed = self.preprocessor.apply(&features)?;
        self.model.predict_frame(&transformed)
    }

    /// `raw` with an appended `predicted_species` column.
    pub fn predict_frame(&self, raw: &DataFrame) -> Result<DataFrame> {
        let predicted = self.predict(raw)?;
        let mut out = raw.clone();
        out.with_column(Series::new(PREDICTION_COLUMN.into(), predicted))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::RandomForestParams;
    use penguin_processing::{Preprocessor, model_input_columns};
    use pretty_assertions::assert_eq;

    fn raw() -> DataFrame {
        df![
            "island" => ["Torgersen", "Biscoe", "Dream", "Torgersen", "Biscoe", "Dream"],
            "bill_length_mm" => [38.1, 47.2, 49.5, 39.0, 46.8, 50.1],
            "bill_depth_mm" => [18.6, 14.9, 18.2, 18.9, 15.1, 18.7],
            "flipper_length_mm" => [189i64, 216, 197, 191, 219, 195],
            "body_mass_g" => [3700i64, 5100, 3750, 3650, 5000, 3800],
            "sex" => ["MALE", "FEMALE", "MALE", "FEMALE", "MALE", "FEMALE"],
        ]
        .unwrap()
    }

    fn labels() -> Vec<String> {
        ["Adelie", "Gentoo", "Chinstrap", "Adelie", "Gentoo", "Chinstrap"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn runner() -> InferenceRunner {
        let features = engineer_features(&raw()).unwrap().select(model_input_columns()).unwrap();
        let preprocessor = Preprocessor::build(&features).unwrap();
        let rows = preprocessor.to_matrix(&features).unwrap();
        let params = RandomForestParams {
            n_trees: 10,
            ..RandomForestParams::default()
        };
        let model =
            RandomForestModel::fit(&params, preprocessor.output_columns(), &rows, &labels())
                .unwrap();
        InferenceRunner::from_parts(preprocessor, model).unwrap()
    }

    #[test]
    fn test_one_known_label_per_row() {
        let runner = runner();
        let predicted = runner.predict(&raw()).unwrap();
        assert_eq!(predicted.len(), 6);
        assert!(predicted.iter().all(|p| runner.classes().contains(p)));
    }

    #[test]
    fn test_predict_frame_appends_column() {
        let out = runner().predict_frame(&raw()).unwrap();
        assert_eq!(out.width(), raw().width() + 1);
        assert_eq!(out.column(PREDICTION_COLUMN).unwrap().len(), 6);
        assert!(out.select(raw().get_column_names_owned()).unwrap().equals(&raw()));
    }

    #[test]
    fn test_missing_measurement_is_feature_error() {
        let df = raw().drop("bill_depth_mm").unwrap();
        let err = runner().predict(&df).unwrap_err();
        assert_eq!(err.error_code(), "FEATURE_ENGINEERING_FAILED");
    }

    #[test]
    fn test_unseen_island_still_predicts() {
        let mut df = raw().head(Some(1));
        df.with_column(Series::new("island".into(), ["Anvers"])).unwrap();
        assert_eq!(runner().predict(&df).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_artifacts_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = InferenceRunner::load(dir.path().join("p.json"), dir.path().join("m.json"))
            .unwrap_err();
        assert!(err.is_artifact_error());
    }
}
