//! Application-level errors.
//!
//! [`AppError`] collapses the library errors into the categories a client
//! sees. Each category has a status code and serializes as the
//! `{"error": message}` body.

use dataqc_learning::LearningError;
use dataqc_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Error returned by the application commands.
///
/// The message is already client-facing, so `Display` prints it unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    /// The upload could not be parsed or holds no rows.
    #[error("{0}")]
    DatasetRead(String),

    #[error("{0}")]
    Training(String),

    #[error("{0}")]
    NoNumericData(String),

    #[error("{0}")]
    MissingColumns(String),

    #[error("{0}")]
    ColumnMismatch(String),

    #[error("{0}")]
    Prediction(String),

    #[error("{0}")]
    ModelNotFound(String),

    #[error("{0}")]
    ModelLoad(String),

    /// Invalid application or training configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure outside the libraries (directories, uploads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP-style status code of the error category.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DatasetRead(_)
            | Self::NoNumericData(_)
            | Self::MissingColumns(_)
            | Self::ColumnMismatch(_)
            | Self::InvalidConfig(_) => 400,
            Self::ModelNotFound(_) => 404,
            Self::Training(_)
            | Self::Prediction(_)
            | Self::ModelLoad(_)
            | Self::Io(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Stable code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatasetRead(_) => "DATASET_READ_ERROR",
            Self::Training(_) => "TRAINING_ERROR",
            Self::NoNumericData(_) => "NO_NUMERIC_DATA",
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::ColumnMismatch(_) => "COLUMN_MISMATCH",
            Self::Prediction(_) => "PREDICTION_ERROR",
            Self::ModelNotFound(_) => "MODEL_NOT_FOUND",
            Self::ModelLoad(_) => "MODEL_LOAD_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The `{"error": message}` body.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 1)?;
        state.serialize_field("error", &self.to_string())?;
        state.end()
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        if err.is_input_error() {
            Self::DatasetRead(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<LearningError> for AppError {
    fn from(err: LearningError) -> Self {
        let message = err.to_string();
        match err {
            LearningError::Processing(inner) => inner.into(),
            LearningError::InvalidConfig(reason) => Self::InvalidConfig(reason),
            LearningError::Training(_) => Self::Training(message),
            LearningError::NoNumericData => Self::NoNumericData(message),
            LearningError::MissingColumns(_) => Self::MissingColumns(message),
            LearningError::ColumnMismatch(_) => Self::ColumnMismatch(message),
            LearningError::Prediction(_) => Self::Prediction(message),
            LearningError::ModelNotFound { .. } => Self::ModelNotFound(message),
            LearningError::ModelLoad(_) => Self::ModelLoad(message),
            _ => Self::Internal(message),
        }
    }
}

/// Result type alias for application commands.
pub type Result<T> = std::result::Result<T, AppError>;
