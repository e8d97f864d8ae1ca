//! Derived ratio features.
//!
//! Both the trainer and the inference runner call [`engineer_features`], which is
//! what keeps the ratios identical between training and serving.

use crate::error::{ProcessingError, Result};
use crate::schema::{
    BILL_DEPTH, BILL_LENGTH, BILL_RATIO, BODY_MASS, FLIPPER_LENGTH, MASS_FLIPPER_RATIO,
};
use anyhow::{Context, bail};
use crate::utils::numeric_values;
use polars::prelude::*;
use tracing::{error, info};

/// Return a copy of `df` with `bill_length_depth_ratio` and `mass_flipper_ratio`
/// appended. Existing columns are left as they are.
///
/// A null operand gives a null ratio. Any failure is reported as
/// [`ProcessingError::FeatureEngineering`] carrying the underlying cause.
pub fn engineer_features(df: &DataFrame) -> Result<DataFrame> {
    info!("Starting feature engineering");
    add_ratios(df).map_err(|e| {
        error!("Feature engineering failed: {:#}", e);
        ProcessingError::feature_engineering(e)
    })
}

fn add_ratios(df: &DataFrame) -> anyhow::Result<DataFrame> {
    let bill_ratio = ratio(df, BILL_LENGTH, BILL_DEPTH, BILL_RATIO)?;
    let mass_ratio = ratio(df, BODY_MASS, FLIPPER_LENGTH, MASS_FLIPPER_RATIO)?;

    let mut out = df.clone();
    out.with_column(bill_ratio)?;
    out.with_column(mass_ratio)?;

    info!("Added features: {} and {}", BILL_RATIO, MASS_FLIPPER_RATIO);
    Ok(out)
}

fn ratio(
    df: &DataFrame,
    numerator: &str,
    denominator: &str,
    name: &str,
) -> anyhow::Result<Series> {
    let top = numeric_values(df, numerator).with_context(|| format!("reading {numerator}"))?;
    let bottom =
        numeric_values(df, denominator).with_context(|| format!("reading {denominator}"))?;

    let mut values = Vec::with_capacity(top.len());
    for (row, (a, b)) in top.into_iter().zip(bottom).enumerate() {
        let value = match (a, b) {
            (Some(a), Some(b)) => {
                let v = a / b;
                if !v.is_finite() {
                    bail!("{numerator} / {denominator} is not finite at row {row} ({a} / {b})");
                }
                Some(v)
            }
            _ => None,
        };
        values.push(value);
    }

    Ok(Series::new(name.into(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurements() -> DataFrame {
        df![
            "species" => ["Adelie", "Gentoo", "Chinstrap"],
            "bill_length_mm" => [39.1, 46.5, 49.0],
            "bill_depth_mm" => [18.7, 14.8, 18.5],
            "flipper_length_mm" => [181i64, 217, 196],
            "body_mass_g" => [3750i64, 5200, 3800],
        ]
        .unwrap()
    }

    #[test]
    fn test_ratios_match_division() {
        let df = measurements();
        let out = engineer_features(&df).unwrap();

        let bill = numeric_values(&out, BILL_RATIO).unwrap();
        let mass = numeric_values(&out, MASS_FLIPPER_RATIO).unwrap();
        let lengths = [39.1, 46.5, 49.0];
        let depths = [18.7, 14.8, 18.5];
        let masses = [3750.0, 5200.0, 3800.0];
        let flippers = [181.0, 217.0, 196.0];

        for i in 0..3 {
            assert!((bill[i].unwrap() - lengths[i] / depths[i]).abs() < 1e-6);
            assert!((mass[i].unwrap() - masses[i] / flippers[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_original_columns_preserved() {
        let df = measurements();
        let out = engineer_features(&df).unwrap();
        assert_eq!(out.width(), df.width() + 2);
        assert_eq!(out.height(), df.height());
        assert!(out.select(df.get_column_names_owned()).unwrap().equals(&df));
    }

    #[test]
    fn test_null_operand_gives_null_ratio() {
        let df = df![
            "bill_length_mm" => [Some(39.1), None],
            "bill_depth_mm" => [18.7, 14.8],
            "flipper_length_mm" => [181i64, 217],
            "body_mass_g" => [3750i64, 5200],
        ]
        .unwrap();
        let out = engineer_features(&df).unwrap();
        assert_eq!(out.column(BILL_RATIO).unwrap().null_count(), 1);
        assert_eq!(out.column(MASS_FLIPPER_RATIO).unwrap().null_count(), 0);
    }

    #[test]
    fn test_missing_column_is_feature_error() {
        let df = measurements().drop("bill_depth_mm").unwrap();
        let err = engineer_features(&df).unwrap_err();
        assert_eq!(err.error_code(), "FEATURE_ENGINEERING_FAILED");
        let cause = std::error::Error::source(&err).expect("cause attached");
        assert!(cause.to_string().contains("bill_depth_mm"));
    }

    #[test]
    fn test_empty_frame_is_feature_error() {
        let err = engineer_features(&DataFrame::empty()).unwrap_err();
        assert!(matches!(err, ProcessingError::FeatureEngineering { .. }));
    }

    #[test]
    fn test_non_numeric_is_feature_error() {
        let df = df![
            "bill_length_mm" => ["long", "short"],
            "bill_depth_mm" => [18.7, 14.8],
            "flipper_length_mm" => [181i64, 217],
            "body_mass_g" => [3750i64, 5200],
        ]
        .unwrap();
        assert!(matches!(
            engineer_features(&df),
            Err(ProcessingError::FeatureEngineering { .. })
        ));
    }

    #[test]
    fn test_zero_divisor_is_feature_error() {
        let df = df![
            "bill_length_mm" => [39.1],
            "bill_depth_mm" => [0.0],
            "flipper_length_mm" => [181i64],
            "body_mass_g" => [3750i64],
        ]
        .unwrap();
        let err = engineer_features(&df).unwrap_err();
        assert!(err.to_string().contains("not finite"));
    }
}
