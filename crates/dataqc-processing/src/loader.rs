//! CSV loading for uploaded datasets.
//!
//! Uploads arrive either as raw bytes (prediction payloads) or as a path to a
//! previously saved upload (training). Both go through the same reader
//! options so a file analyzed once parses identically when trained on.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Number of rows used to infer column dtypes.
const INFER_SCHEMA_ROWS: usize = 1000;

fn read_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
}

/// Parse CSV bytes into a DataFrame.
///
/// Returns [`ProcessingError::DatasetRead`] when the bytes are empty or not
/// a readable table.
pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProcessingError::DatasetRead(
            "No columns to parse from file".to_string(),
        ));
    }

    let cursor = Cursor::new(bytes.to_vec());
    let df = read_options()
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| ProcessingError::DatasetRead(e.to_string()))?;

    debug!("Parsed upload: {:?}", df.shape());
    Ok(df)
}

/// Parse a CSV file on disk into a DataFrame.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        ProcessingError::DatasetRead(format!("{}: {}", path.display(), e))
    })?;
    read_csv_bytes(&bytes)
}

/// Reject frames without rows.
pub fn ensure_not_empty(df: &DataFrame) -> Result<()> {
    if df.height() == 0 {
        return Err(ProcessingError::EmptyDataset);
    }
    Ok(())
}
