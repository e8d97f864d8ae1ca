//! Fitted column transformation: impute, scale and one-hot encode.
//!
//! [`Preprocessor::build`] computes every statistic once, from the training
//! partition. The resulting [`FittedPreprocessor`] is immutable: [`apply`] only
//! reads the stored medians, means, scales, modes and vocabularies, so training,
//! validation and inference tables all come out with the same columns in the same
//! order.
//!
//! | Branch | Missing values | Transform |
//! |--------|----------------|-----------|
//! | numeric | training median | `(x - mean) / std` |
//! | categorical | training mode | one indicator per training category |
//!
//! A category that was never seen during `build` encodes as all zeros.
//!
//! [`apply`]: FittedPreprocessor::apply

use crate::error::{ProcessingError, Result};
use crate::utils::{
    DtypeCategory, get_dtype_category, numeric_series, numeric_values, population_std,
    string_mode, string_values,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Version written into persisted preprocessors.
pub const PREPROCESSOR_FORMAT_VERSION: u32 = 1;

/// Fitted state for one numeric input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnState {
    pub name: String,
    /// Replacement for missing values.
    pub median: f64,
    /// Mean of the imputed training values.
    pub mean: f64,
    /// Population std of the imputed training values, 1.0 for constant columns.
    pub scale: f64,
}

impl NumericColumnState {
    fn transform(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.median) - self.mean) / self.scale
    }
}

/// Fitted state for one categorical input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnState {
    pub name: String,
    /// Replacement for missing values.
    pub mode: String,
    /// Sorted vocabulary observed during build.
    pub categories: Vec<String>,
}

impl CategoricalColumnState {
    fn indicator_name(&self, category: &str) -> String {
        format!("{}_{}", self.name, category)
    }
}

/// Entry point for fitting a [`FittedPreprocessor`].
pub struct Preprocessor;

impl Preprocessor {
    /// Fit the transformation on `training`.
    ///
    /// Numeric and categorical columns are inferred from the declared dtypes, in
    /// frame order. Columns of any other dtype are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`ProcessingError::Preprocessing`] when the table has no rows or no
    /// usable columns, or when a column has no non-null value to learn from.
    pub fn build(training: &DataFrame) -> Result<FittedPreprocessor> {
        info!("Building preprocessor on {} rows", training.height());

        if training.height() == 0 || training.width() == 0 {
            return Err(ProcessingError::Preprocessing(
                "cannot build a preprocessor from an empty table".to_string(),
            ));
        }

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for column in training.get_columns() {
            let name = column.name().to_string();
            match get_dtype_category(column.dtype()) {
                DtypeCategory::Numeric => numeric.push(fit_numeric(training, &name)?),
                DtypeCategory::Categorical => {
                    categorical.push(fit_categorical(training, &name)?)
                }
                DtypeCategory::Other => {
                    warn!(
                        "Skipping column '{}' with unsupported dtype {}",
                        name,
                        column.dtype()
                    );
                }
            }
        }

        if numeric.is_empty() && categorical.is_empty() {
            return Err(ProcessingError::Preprocessing(
                "no numeric or categorical columns to transform".to_string(),
            ));
        }

        let fitted = FittedPreprocessor::from_states(numeric, categorical);
        info!(
            "Preprocessor built: {} numeric, {} categorical -> {} output columns",
            fitted.numeric.len(),
            fitted.categorical.len(),
            fitted.output_columns.len()
        );
        Ok(fitted)
    }
}

fn fit_numeric(df: &DataFrame, name: &str) -> Result<NumericColumnState> {
    let series = numeric_series(df, name)?;
    let median = series.median().ok_or_else(|| {
        ProcessingError::Preprocessing(format!("numeric column '{name}' has no values"))
    })?;

    let imputed = series.f64()?.fill_null_with_values(median)?.into_series();
    let mean = imputed.mean().unwrap_or(median);
    let std = population_std(&imputed, mean)?;
    let scale = if std > 0.0 { std } else { 1.0 };

    debug!(
        "Numeric '{}': median={:.4}, mean={:.4}, scale={:.4}",
        name, median, mean, scale
    );
    Ok(NumericColumnState {
        name: name.to_string(),
        median,
        mean,
        scale,
    })
}

fn fit_categorical(df: &DataFrame, name: &str) -> Result<CategoricalColumnState> {
    let values = string_values(df, name)?;
    let mode = string_mode(&values).ok_or_else(|| {
        ProcessingError::Preprocessing(format!("categorical column '{name}' has no values"))
    })?;

    let categories: Vec<String> = values
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    debug!("Categorical '{}': mode={}, categories={:?}", name, mode, categories);
    Ok(CategoricalColumnState {
        name: name.to_string(),
        mode,
        categories,
    })
}

/// An immutable, reusable column transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    format_version: u32,
    numeric: Vec<NumericColumnState>,
    categorical: Vec<CategoricalColumnState>,
    output_columns: Vec<String>,
}

impl FittedPreprocessor {
    fn from_states(
        numeric: Vec<NumericColumnState>,
        categorical: Vec<CategoricalColumnState>,
    ) -> Self {
        let mut output_columns: Vec<String> = numeric.iter().map(|s| s.name.clone()).collect();
        for state in &categorical {
            output_columns.extend(state.categories.iter().map(|c| state.indicator_name(c)));
        }

        Self {
            format_version: PREPROCESSOR_FORMAT_VERSION,
            numeric,
            categorical,
            output_columns,
        }
    }

    /// Output column names, in order.
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    /// Input columns this transformation reads.
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.categorical.iter().map(|s| s.name.as_str()))
            .collect()
    }

    pub fn numeric_columns(&self) -> &[NumericColumnState] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[CategoricalColumnState] {
        &self.categorical
    }

    /// Transform `table` with the fitted statistics.
    ///
    /// Columns the preprocessor was not built on are ignored. The output always
    /// has [`output_columns`](Self::output_columns), contains no nulls, and keeps
    /// the row order of `table`.
    pub fn apply(&self, table: &DataFrame) -> Result<DataFrame> {
        for name in self.input_columns() {
            if table.column(name).is_err() {
                return Err(ProcessingError::Preprocessing(format!(
                    "input column '{name}' is missing"
                )));
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.output_columns.len());

        for state in &self.numeric {
            let values = numeric_values(table, &state.name).map_err(|e| {
                ProcessingError::Preprocessing(format!("column '{}': {}", state.name, e))
            })?;
            let transformed: Vec<f64> = values.into_iter().map(|v| state.transform(v)).collect();
            columns.push(Series::new(state.name.as_str().into(), transformed).into());
        }

        for state in &self.categorical {
            let values = string_values(table, &state.name)?;
            let filled: Vec<&str> = values
                .iter()
                .map(|v| v.as_deref().unwrap_or(state.mode.as_str()))
                .collect();

            let unseen = filled
                .iter()
                .filter(|v| !state.categories.iter().any(|c| c == *v))
                .count();
            if unseen > 0 {
                debug!(
                    "{} value(s) in '{}' were not seen during build; encoded as zeros",
                    unseen, state.name
                );
            }

            for category in &state.categories {
                let indicator: Vec<f64> = filled
                    .iter()
                    .map(|v| if *v == category { 1.0 } else { 0.0 })
                    .collect();
                let name = state.indicator_name(category);
                columns.push(Series::new(name.as_str().into(), indicator).into());
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Row-major feature matrix of [`apply`](Self::apply), one inner vector per row
    /// in `output_columns` order.
    pub fn to_matrix(&self, table: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let transformed = self.apply(table)?;
        let mut rows = vec![Vec::with_capacity(self.output_columns.len()); transformed.height()];

        for name in &self.output_columns {
            for (row, value) in rows.iter_mut().zip(numeric_values(&transformed, name)?) {
                row.push(value.unwrap_or(0.0));
            }
        }
        Ok(rows)
    }

    /// Serialize to an opaque byte blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Restore from a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let fitted: Self = serde_json::from_slice(bytes)?;
        if fitted.format_version != PREPROCESSOR_FORMAT_VERSION {
            return Err(ProcessingError::Preprocessing(format!(
                "unsupported preprocessor format version {}",
                fitted.format_version
            )));
        }
        Ok(fitted)
    }

    /// Persist to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes()?)?;
        info!("Saved fitted preprocessor to {}", path.display());
        Ok(())
    }

    /// Load a preprocessor persisted with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`ProcessingError::ArtifactNotFound`] if nothing exists at `path`,
    /// [`ProcessingError::ArtifactCorrupt`] if the file cannot be decoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProcessingError::ArtifactNotFound {
                path: path.display().to_string(),
            });
        }

        let bytes = fs::read(path)?;
        let fitted = Self::from_bytes(&bytes).map_err(|e| ProcessingError::ArtifactCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!("Loaded fitted preprocessor from {}", path.display());
        Ok(fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn training() -> DataFrame {
        df![
            "island" => [Some("Biscoe"), Some("Dream"), None, Some("Biscoe")],
            "bill_length_mm" => [Some(40.0), None, Some(50.0), Some(44.0)],
            "flipper_length_mm" => [180i64, 190, 200, 210],
            "sex" => ["MALE", "FEMALE", "MALE", "FEMALE"],
        ]
        .unwrap()
    }

    fn column_f64(df: &DataFrame, name: &str) -> Vec<f64> {
        numeric_values(df, name)
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_output_layout() {
        let fitted = Preprocessor::build(&training()).unwrap();
        assert_eq!(
            fitted.output_columns(),
            &[
                "bill_length_mm",
                "flipper_length_mm",
                "island_Biscoe",
                "island_Dream",
                "sex_FEMALE",
                "sex_MALE",
            ]
        );
    }

    #[test]
    fn test_numeric_median_then_standardize() {
        let fitted = Preprocessor::build(&training()).unwrap();
        let state = &fitted.numeric_columns()[0];
        assert_eq!(state.median, 44.0);
        // imputed: 40, 44, 50, 44 -> mean 44.5
        assert!((state.mean - 44.5).abs() < 1e-12);

        let out = fitted.apply(&training()).unwrap();
        let scaled = out.column("bill_length_mm").unwrap().as_materialized_series().clone();
        let mean = scaled.mean().unwrap();
        let std = population_std(&scaled, mean).unwrap();
        assert!(mean.abs() < 1e-9);
        assert!((std - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_count_median_and_imputed_mean() {
        let df = df!["x" => [Some(40.0), None, Some(50.0), Some(44.0), Some(42.0)]].unwrap();
        let preprocessor = Preprocessor::build(&df).unwrap();
        let state = &preprocessor.numeric_columns()[0];

        // median of 40, 42, 44, 50 is the midpoint of the middle pair
        assert_eq!(state.median, 43.0);
        let imputed = [40.0f64, 43.0, 50.0, 44.0, 42.0];
        assert!((state.mean - 43.8).abs() < 1e-12);
        let expected_std =
            (imputed.iter().map(|v| (v - 43.8).powi(2)).sum::<f64>() / 5.0).sqrt();
        assert!((state.scale - expected_std).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_mode_imputation() {
        let fitted = Preprocessor::build(&training()).unwrap();
        let out = fitted.apply(&training()).unwrap();
        // row 2 had a null island; mode is Biscoe
        assert_eq!(column_f64(&out, "island_Biscoe"), vec![1.0, 0.0, 1.0, 1.0]);
        assert_eq!(column_f64(&out, "island_Dream"), vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_apply_on_training_has_no_nulls_and_more_columns() {
        let df = training();
        let out = Preprocessor::build(&df).unwrap().apply(&df).unwrap();
        assert_eq!(out.height(), df.height());
        assert!(out.width() > df.width());
        assert!(out.get_columns().iter().all(|c| c.null_count() == 0));
    }

    #[test]
    fn test_apply_twice_same_layout() {
        let df = training();
        let fitted = Preprocessor::build(&df).unwrap();
        let a = fitted.apply(&df).unwrap();
        let b = fitted.apply(&df).unwrap();
        assert_eq!(a.get_column_names(), b.get_column_names());
        assert!(a.equals(&b));
    }

    #[test]
    fn test_unseen_category_is_zero_vector() {
        let fitted = Preprocessor::build(&training()).unwrap();
        let new_row = df![
            "island" => ["Torgersen"],
            "bill_length_mm" => [41.0],
            "flipper_length_mm" => [185i64],
            "sex" => ["MALE"],
        ]
        .unwrap();

        let out = fitted.apply(&new_row).unwrap();
        assert_eq!(out.width(), fitted.output_columns().len());
        assert_eq!(column_f64(&out, "island_Biscoe"), vec![0.0]);
        assert_eq!(column_f64(&out, "island_Dream"), vec![0.0]);
        assert_eq!(column_f64(&out, "sex_MALE"), vec![1.0]);
    }

    #[test]
    fn test_extra_columns_ignored_and_statistics_not_refit() {
        let fitted = Preprocessor::build(&training()).unwrap();
        let other = df![
            "species" => ["Gentoo"],
            "sex" => ["FEMALE"],
            "flipper_length_mm" => [1000i64],
            "bill_length_mm" => [Option::<f64>::None],
            "island" => ["Dream"],
        ]
        .unwrap();

        let out = fitted.apply(&other).unwrap();
        assert_eq!(out.width(), fitted.output_columns().len());
        // a null is replaced by the training median, then scaled with training stats
        let state = &fitted.numeric_columns()[0];
        let expected = (state.median - state.mean) / state.scale;
        assert!((column_f64(&out, "bill_length_mm")[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let df = df!["x" => [5.0, 5.0, 5.0]].unwrap();
        let fitted = Preprocessor::build(&df).unwrap();
        assert_eq!(fitted.numeric_columns()[0].scale, 1.0);
        assert_eq!(column_f64(&fitted.apply(&df).unwrap(), "x"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_build_empty_is_error() {
        let err = Preprocessor::build(&DataFrame::empty()).unwrap_err();
        assert_eq!(err.error_code(), "PREPROCESSING_FAILED");

        let no_rows = training().head(Some(0));
        assert!(Preprocessor::build(&no_rows).is_err());
    }

    #[test]
    fn test_build_all_null_column_is_error() {
        let df = df![
            "x" => [Option::<f64>::None, None],
            "y" => [1.0, 2.0],
        ]
        .unwrap();
        assert!(matches!(
            Preprocessor::build(&df),
            Err(ProcessingError::Preprocessing(_))
        ));
    }

    #[test]
    fn test_apply_missing_input_column() {
        let fitted = Preprocessor::build(&training()).unwrap();
        let df = training().drop("sex").unwrap();
        let err = fitted.apply(&df).unwrap_err();
        assert!(err.to_string().contains("sex"));
    }

    #[test]
    fn test_to_matrix_row_major() {
        let df = training();
        let fitted = Preprocessor::build(&df).unwrap();
        let matrix = fitted.to_matrix(&df).unwrap();

        assert_eq!(matrix.len(), 4);
        assert!(matrix.iter().all(|row| row.len() == 6));
        // row 1: Dream, FEMALE
        assert_eq!(&matrix[1][2..], &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_bytes_round_trip_identical_output() {
        let df = training();
        let fitted = Preprocessor::build(&df).unwrap();
        let restored = FittedPreprocessor::from_bytes(&fitted.to_bytes().unwrap()).unwrap();

        assert_eq!(restored, fitted);
        assert!(restored.apply(&df).unwrap().equals(&fitted.apply(&df).unwrap()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/preprocessor.json");
        let fitted = Preprocessor::build(&training()).unwrap();

        fitted.save(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(FittedPreprocessor::load(&path).unwrap(), fitted);
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FittedPreprocessor::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ProcessingError::ArtifactNotFound { .. }));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"not json").unwrap();
        let corrupt = FittedPreprocessor::load(&path).unwrap_err();
        assert!(matches!(corrupt, ProcessingError::ArtifactCorrupt { .. }));
        assert!(corrupt.is_artifact_error());
    }
}
