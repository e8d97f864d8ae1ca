//! Column names and declared types of the penguin dataset.

use polars::prelude::DataType;

/// Label column predicted by the classifier.
pub const LABEL_COLUMN: &str = "species";

pub const ISLAND: &str = "island";
pub const BILL_LENGTH: &str = "bill_length_mm";
pub const BILL_DEPTH: &str = "bill_depth_mm";
pub const FLIPPER_LENGTH: &str = "flipper_length_mm";
pub const BODY_MASS: &str = "body_mass_g";
pub const SEX: &str = "sex";

/// `bill_length_mm / bill_depth_mm`
pub const BILL_RATIO: &str = "bill_length_depth_ratio";
/// `body_mass_g / flipper_length_mm`
pub const MASS_FLIPPER_RATIO: &str = "mass_flipper_ratio";

/// Column appended to inference output.
pub const PREDICTION_COLUMN: &str = "predicted_species";

/// Declared type of a required column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Float,
    Integer,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "str",
            ColumnKind::Float => "f64",
            ColumnKind::Integer => "i64",
        }
    }

    /// Whether a polars dtype satisfies this kind.
    pub fn accepts(&self, dtype: &DataType) -> bool {
        match self {
            ColumnKind::Text => matches!(dtype, DataType::String | DataType::Categorical(_, _)),
            ColumnKind::Float => matches!(dtype, DataType::Float64),
            ColumnKind::Integer => matches!(dtype, DataType::Int64),
        }
    }
}

/// Required columns in schema order.
pub const REQUIRED_COLUMNS: [(&str, ColumnKind); 7] = [
    (LABEL_COLUMN, ColumnKind::Text),
    (ISLAND, ColumnKind::Text),
    (BILL_LENGTH, ColumnKind::Float),
    (BILL_DEPTH, ColumnKind::Float),
    (FLIPPER_LENGTH, ColumnKind::Integer),
    (BODY_MASS, ColumnKind::Integer),
    (SEX, ColumnKind::Text),
];

/// Raw measurement columns the model reads (the label excluded).
pub const RAW_FEATURE_COLUMNS: [&str; 6] =
    [ISLAND, BILL_LENGTH, BILL_DEPTH, FLIPPER_LENGTH, BODY_MASS, SEX];

/// Derived ratio columns added by [`crate::features::engineer_features`].
pub const DERIVED_COLUMNS: [&str; 2] = [BILL_RATIO, MASS_FLIPPER_RATIO];

/// Every column handed to the preprocessor, in order.
pub fn model_input_columns() -> Vec<&'static str> {
    RAW_FEATURE_COLUMNS
        .iter()
        .chain(DERIVED_COLUMNS.iter())
        .copied()
        .collect()
}
