//! Prediction for stored models.
//!
//! The [`InferenceDispatcher`] picks the artifact to run (portable graph
//! first, native artifact second), computes per-row outputs and records the
//! batch's trend value in the [`PredictionHistory`].

use crate::artifact::ModelArtifact;
use crate::error::{LearningError, Result};
use crate::features::{numeric_matrix, require_columns};
use crate::history::PredictionHistory;
use crate::portable::InferenceSession;
use crate::store::{LocatedArtifact, ModelStore};
use crate::types::{ClassLabel, PredictionOutput, PredictionResponse};
use dataqc_processing::{column_as_f64, ensure_not_empty, numeric_column_names};
use ndarray::Array2;
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::{debug, info, warn};

/// Runs predictions against a [`ModelStore`].
#[derive(Debug, Clone, Copy)]
pub struct InferenceDispatcher<'a> {
    store: &'a ModelStore,
    history: &'a PredictionHistory,
}

impl<'a> InferenceDispatcher<'a> {
    pub fn new(store: &'a ModelStore, history: &'a PredictionHistory) -> Self {
        Self { store, history }
    }

    /// Predict every row of `df` with model `model_id`.
    ///
    /// On success the trend value of the batch is appended to the model's
    /// history (an append failure is logged only) and the response carries
    /// the stored history.
    ///
    /// # Errors
    ///
    /// - `EMPTY_DATASET`: `df` has no rows
    /// - [`ModelNotFound`](LearningError::ModelNotFound): no artifact for the id
    /// - [`ModelLoad`](LearningError::ModelLoad): the artifact cannot be decoded
    /// - [`NoNumericData`](LearningError::NoNumericData): portable model, no numeric column
    /// - [`MissingColumns`](LearningError::MissingColumns): anomaly model, fitted columns absent
    /// - [`ColumnMismatch`](LearningError::ColumnMismatch): supervised model, incompatible columns
    /// - [`Prediction`](LearningError::Prediction): any other failure while predicting
    pub fn predict(&self, model_id: &str, df: &DataFrame) -> Result<PredictionResponse> {
        ensure_not_empty(df)?;

        let output = match self.store.locate(model_id)? {
            LocatedArtifact::Portable(path) => predict_portable(&path, df)?,
            LocatedArtifact::Native(path) => predict_native(&path, df)?,
        };
        info!("Model {} predicted {} rows", model_id, output.len());

        let value = output.trend_value();
        if let Err(e) = self.history.append(model_id, value, output.kind()) {
            warn!("Failed to record prediction history for {}: {}", model_id, e);
        }

        Ok(PredictionResponse {
            output,
            history: self.history.read(model_id),
        })
    }
}

fn predict_portable(path: &Path, df: &DataFrame) -> Result<PredictionOutput> {
    let session = InferenceSession::load(path)?;
    let input_name = session
        .inputs()
        .first()
        .map(|input| input.name.clone())
        .ok_or_else(|| LearningError::ModelLoad("graph declares no inputs".to_string()))?;

    let numeric = numeric_column_names(df);
    if numeric.is_empty() {
        return Err(LearningError::NoNumericData);
    }

    let columns = match session.feature_names() {
        Some(names) if names.iter().all(|name| numeric.contains(name)) => names.to_vec(),
        _ => numeric,
    };
    debug!("Feeding {} columns to portable graph", columns.len());

    let mut x = Array2::<f32>::from_elem((df.height(), columns.len()), f32::NAN);
    for (j, name) in columns.iter().enumerate() {
        for (i, value) in column_as_f64(df, name)?.into_iter().enumerate() {
            if let Some(v) = value {
                x[[i, j]] = v as f32;
            }
        }
    }

    Ok(PredictionOutput::Predictions(
        session.run(&input_name, x.view())?,
    ))
}

fn predict_native(path: &Path, df: &DataFrame) -> Result<PredictionOutput> {
    match ModelArtifact::load(path)? {
        ModelArtifact::Unsupervised {
            detector,
            feature_columns,
        } => {
            require_columns(df, &feature_columns)?;
            let x = numeric_matrix(df, &feature_columns, 0.0)?;
            Ok(PredictionOutput::AnomalyScore(detector.decision_function(&x)?))
        }
        ModelArtifact::Supervised(pipeline) => {
            let labels = pipeline.predict(df).map_err(|e| match e {
                LearningError::ColumnMismatch(_) => e,
                other => LearningError::Prediction(other.to_string()),
            })?;
            Ok(PredictionOutput::Predictions(
                labels.iter().map(ClassLabel::to_json).collect(),
            ))
        }
    }
}
