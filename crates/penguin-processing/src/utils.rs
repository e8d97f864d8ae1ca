//! Shared column helpers.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for preprocessing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// String, categorical or boolean values
    Categorical,
    /// Anything the preprocessor does not handle
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if matches!(
        dtype,
        DataType::String | DataType::Categorical(_, _) | DataType::Boolean
    ) {
        DtypeCategory::Categorical
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Read a column as `f64` values, nulls preserved.
///
/// The cast is strict: text that does not parse as a number is an error rather
/// than a silent null.
pub fn numeric_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let floats = numeric_series(df, name)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Read a column as a `Float64` series, with the same strict cast as
/// [`numeric_values`].
pub fn numeric_series(df: &DataFrame, name: &str) -> PolarsResult<Series> {
    df.column(name)?
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
}

/// Read a column as owned strings, nulls preserved.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

// =============================================================================
// Statistics
// =============================================================================

/// Most frequent non-null value. Ties go to the lexicographically smallest value
/// so the result does not depend on hash order.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

/// Population standard deviation of the non-null values around `mean`.
///
/// Divides by `n`, not `n - 1`, to match how the scaler is fitted.
pub fn population_std(series: &Series, mean: f64) -> PolarsResult<f64> {
    let n = (series.len() - series.null_count()) as f64;
    if n == 0.0 {
        return Ok(0.0);
    }

    let float_series = series.f64()?;
    let variance: f64 = float_series
        .into_iter()
        .filter_map(|v| v.map(|val| (val - mean).powi(2)))
        .sum::<f64>()
        / n;

    Ok(variance.sqrt())
}

/// Names of the columns of `df` that contain at least one null, in frame order.
pub fn columns_with_nulls(df: &DataFrame, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            df.column(name)
                .map(|col| col.null_count() > 0)
                .unwrap_or(false)
        })
        .map(|name| name.to_string())
        .collect()
}
