//! Error types for dataset loading and profiling.
//!
//! Errors are serializable so they can be returned to a client as a
//! `{code, message}` body.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the processing crate.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The uploaded bytes could not be parsed as a table.
    #[error("Failed to read CSV file: {0}")]
    DatasetRead(String),

    /// The table parsed but holds no rows.
    #[error("CSV file is empty")]
    EmptyDataset,

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatasetRead(_) => "DATASET_READ_ERROR",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller can fix this by sending different input.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::DatasetRead(_) | Self::EmptyDataset | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ProcessingError::EmptyDataset.error_code(), "EMPTY_DATASET");
        assert_eq!(
            ProcessingError::DatasetRead("bad quote".to_string()).error_code(),
            "DATASET_READ_ERROR"
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(ProcessingError::EmptyDataset.is_input_error());
        assert!(ProcessingError::DatasetRead("x".to_string()).is_input_error());
        let io = std::io::Error::other("disk");
        assert!(!ProcessingError::Io(io).is_input_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::ColumnNotFound("age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("age"));
    }

    #[test]
    fn test_with_context_preserves_code() {
        let error = ProcessingError::EmptyDataset.with_context("While loading upload");
        assert!(error.to_string().contains("While loading upload"));
        assert_eq!(error.error_code(), "EMPTY_DATASET");
        assert!(error.is_input_error());
    }
}
