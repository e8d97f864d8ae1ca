//! CSV loading and writing.

use crate::error::{ProcessingError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Load a CSV file with a header row.
///
/// The whole file is scanned for schema inference so that integer columns stay
/// `Int64` even when the first rows happen to look different.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    info!("Loading data from {}", path.display());

    if !path.exists() {
        return Err(ProcessingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open {}", path.display()))?
        .finish()
        .context(format!("Failed to parse {}", path.display()))?;

    info!("Loaded data: {} rows, {} columns", df.height(), df.width());
    for column in df.get_columns() {
        debug!("Column '{}': {}", column.name(), column.dtype());
    }

    Ok(df)
}

/// Write a DataFrame as CSV, creating parent directories as needed.
pub fn write_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    let mut out = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut out)
        .context(format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the first `n` rows for a quick look at what was loaded.
pub fn write_sample(df: &DataFrame, path: impl AsRef<Path>, n: usize) -> Result<()> {
    let path = path.as_ref();
    write_csv(&df.head(Some(n)), path)?;
    info!("Saved sample to {}", path.display());
    Ok(())
}
