//! Error types for the dataqc-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by training,
//! artifact persistence, portable export and inference.
//!
//! # Error Handling
//!
//! Errors are designed to be:
//! - **Descriptive**: each variant carries the detail a client needs
//! - **Classifiable**: [`LearningError::error_code`] gives a stable code
//! - **Serializable**: errors serialize as `{code, message}`

use dataqc_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for dataqc-learning operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid training configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Training could not produce a model.
    ///
    /// Raised for datasets without rows, without usable feature columns, or
    /// when fitting fails.
    #[error("Training failed: {0}")]
    Training(String),

    /// The prediction input has no numeric column to feed the portable graph.
    #[error("No numeric columns found in the data")]
    NoNumericData,

    /// Fitted feature columns are absent from the prediction input.
    ///
    /// Columns are listed in fitted order.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The prediction input is structurally incompatible with the fitted
    /// pipeline (missing or mistyped feature columns).
    #[error(
        "Column mismatch: {0}. Please ensure prediction data has the same structure as training data."
    )]
    ColumnMismatch(String),

    /// Running a loaded model failed.
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// No artifact exists for the model identifier.
    #[error("Model not found")]
    ModelNotFound {
        /// The identifier that was looked up.
        model_id: String,
    },

    /// An artifact exists but could not be decoded.
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// The fitted pipeline cannot be expressed as a portable graph.
    #[error("Portable export failed: {0}")]
    Export(String),

    /// Dataset loading error from the processing crate.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error during artifact or history file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary artifact encoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LearningError {
    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Training(_) => "TRAINING_ERROR",
            Self::NoNumericData => "NO_NUMERIC_DATA",
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::ColumnMismatch(_) => "COLUMN_MISMATCH",
            Self::Prediction(_) => "PREDICTION_ERROR",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::ModelLoad(_) => "MODEL_LOAD_ERROR",
            Self::Export(_) => "EXPORT_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
