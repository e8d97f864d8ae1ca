//! Schema, null and range checks on a raw dataset.
//!
//! Rules run in a fixed order and stop at the first violation:
//!
//! 1. every required column exists with its declared type (an all-null column
//!    passes this rule and is reported by the next one)
//! 2. no required column contains nulls
//! 3. `bill_length_mm` is strictly positive on every row
//!
//! A passing dataset is returned untouched.

use crate::error::{Result, ValidationError};
use crate::schema::{BILL_LENGTH, REQUIRED_COLUMNS};
use crate::utils::{columns_with_nulls, numeric_values};
use polars::prelude::*;
use tracing::debug;

/// Check `df` against the required schema, returning it unchanged on success.
pub fn validate_dataset(df: &DataFrame) -> std::result::Result<&DataFrame, ValidationError> {
    for (name, kind) in REQUIRED_COLUMNS {
        let column = df
            .column(name)
            .map_err(|_| ValidationError::MissingColumn(name.to_string()))?;
        // an entirely empty CSV column is read as text; leave it to the null rule
        let all_null = column.len() > 0 && column.null_count() == column.len();
        if !all_null && !kind.accepts(column.dtype()) {
            return Err(ValidationError::WrongDtype {
                column: name.to_string(),
                actual: column.dtype().to_string(),
                expected: kind.as_str().to_string(),
            });
        }
    }

    let required: Vec<&str> = REQUIRED_COLUMNS.iter().map(|(name, _)| *name).collect();
    let null_cols = columns_with_nulls(df, &required);
    if !null_cols.is_empty() {
        return Err(ValidationError::NullValues(null_cols));
    }

    // dtype was checked above, so the cast cannot fail
    let non_positive = numeric_values(df, BILL_LENGTH)
        .map(|values| values.iter().flatten().filter(|v| **v <= 0.0).count())
        .unwrap_or(0);
    if non_positive > 0 {
        return Err(ValidationError::NonPositive {
            column: BILL_LENGTH.to_string(),
            count: non_positive,
        });
    }

    debug!("Dataset passed validation ({} rows)", df.height());
    Ok(df)
}

/// Owned form of [`validate_dataset`] for pipelines that pass frames by value.
pub fn validate(df: DataFrame) -> Result<DataFrame> {
    validate_dataset(&df)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_frame() -> DataFrame {
        df![
            "species" => ["Adelie", "Gentoo", "Chinstrap"],
            "island" => ["Torgersen", "Biscoe", "Dream"],
            "bill_length_mm" => [39.1, 46.5, 49.0],
            "bill_depth_mm" => [18.7, 14.8, 18.5],
            "flipper_length_mm" => [181i64, 217, 196],
            "body_mass_g" => [3750i64, 5200, 3800],
            "sex" => ["MALE", "FEMALE", "MALE"],
        ]
        .unwrap()
    }

    #[test]
    fn test_valid_frame_passes_unchanged() {
        let df = valid_frame();
        let out = validate_dataset(&df).unwrap();
        assert!(out.equals(&df));
    }

    #[test]
    fn test_extra_columns_allowed() {
        let mut df = valid_frame();
        df.with_column(Series::new("year".into(), [2007i64, 2008, 2009]))
            .unwrap();
        assert!(validate(df).is_ok());
    }

    #[test]
    fn test_missing_column_named() {
        let df = valid_frame().drop("island").unwrap();
        assert_eq!(
            validate_dataset(&df).unwrap_err(),
            ValidationError::MissingColumn("island".to_string())
        );
    }

    #[test]
    fn test_first_missing_column_in_schema_order() {
        let df = valid_frame().drop("sex").unwrap().drop("island").unwrap();
        assert_eq!(
            validate_dataset(&df).unwrap_err(),
            ValidationError::MissingColumn("island".to_string())
        );
    }

    #[test]
    fn test_wrong_dtype() {
        let mut df = valid_frame();
        df.with_column(Series::new("flipper_length_mm".into(), [181.0, 217.0, 196.0]))
            .unwrap();
        let err = validate_dataset(&df).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::WrongDtype { ref column, .. } if column == "flipper_length_mm"
        ));
    }

    #[test]
    fn test_null_columns_named() {
        let mut df = valid_frame();
        df.with_column(Series::new("sex".into(), [Some("MALE"), None, Some("MALE")]))
            .unwrap();
        df.with_column(Series::new(
            "bill_depth_mm".into(),
            [Some(18.7), Some(14.8), None],
        ))
        .unwrap();

        assert_eq!(
            validate_dataset(&df).unwrap_err(),
            ValidationError::NullValues(vec!["bill_depth_mm".to_string(), "sex".to_string()])
        );
    }

    #[test]
    fn test_all_null_column_reported_as_nulls() {
        let mut df = valid_frame();
        df.with_column(Series::new(
            "bill_depth_mm".into(),
            [Option::<&str>::None, None, None],
        ))
        .unwrap();

        assert_eq!(
            validate_dataset(&df).unwrap_err(),
            ValidationError::NullValues(vec!["bill_depth_mm".to_string()])
        );
    }

    #[test]
    fn test_non_positive_bill_length() {
        let mut df = valid_frame();
        df.with_column(Series::new("bill_length_mm".into(), [39.1, 0.0, -2.0]))
            .unwrap();
        assert_eq!(
            validate_dataset(&df).unwrap_err(),
            ValidationError::NonPositive {
                column: "bill_length_mm".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_owned_validate_wraps_error() {
        let df = valid_frame().drop("species").unwrap();
        let err = validate(df).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }
}
