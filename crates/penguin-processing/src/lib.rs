//! Penguin Dataset Processing Library
//!
//! Everything between a raw penguin measurements CSV and the numeric feature
//! table the species classifier consumes.
//!
//! # Overview
//!
//! - **Loading**: CSV in and out through Polars ([`loader`])
//! - **Validation**: required columns, declared types, nulls and value ranges ([`validation`])
//! - **Feature Engineering**: the two morphological ratios ([`features`])
//! - **Preprocessing**: a fitted, persistable impute/scale/one-hot transform ([`preprocessor`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use penguin_processing::{Preprocessor, engineer_features, load_dataset, validate};
//!
//! let df = validate(load_dataset("data/raw/penguins_cleaned.csv")?)?;
//! let df = engineer_features(&df)?;
//!
//! let fitted = Preprocessor::build(&df)?;
//! let features = fitted.apply(&df)?;
//! fitted.save("models/preprocessor.json")?;
//! ```
//!
//! The same [`FittedPreprocessor`] must be used for training, evaluation and
//! inference; [`FittedPreprocessor::load`] restores it from disk.

pub mod error;
pub mod features;
pub mod loader;
pub mod preprocessor;
pub mod schema;
pub mod utils;
pub mod validation;

// Re-exports for convenient access
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt, ValidationError};
pub use features::engineer_features;
pub use loader::{load_dataset, write_csv, write_sample};
pub use preprocessor::{
    CategoricalColumnState, FittedPreprocessor, NumericColumnState, PREPROCESSOR_FORMAT_VERSION,
    Preprocessor,
};
pub use schema::{
    ColumnKind, DERIVED_COLUMNS, LABEL_COLUMN, PREDICTION_COLUMN, RAW_FEATURE_COLUMNS,
    REQUIRED_COLUMNS, model_input_columns,
};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
pub use validation::{validate, validate_dataset};
