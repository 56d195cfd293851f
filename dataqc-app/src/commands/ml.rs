//! Training, prediction and prediction history commands.

use std::path::Path;

use dataqc_learning::{
    HistoryEntry, InferenceDispatcher, ModelKind, PredictionResponse, TrainingPipeline,
};
use dataqc_processing::{discover_target, read_csv_bytes, read_csv_path};
use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::error::Result;

// ============================================================================
// TYPES
// ============================================================================

/// Result of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainResponse {
    pub model_id: String,
    #[serde(rename = "type")]
    pub kind: ModelKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub native_path: String,
    /// Present only when the portable graph was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portable_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Train a model on a saved upload.
///
/// The target is rediscovered from the file: supervised when one is found,
/// anomaly detection otherwise.
pub fn train(ctx: &AppContext, saved_path: impl AsRef<Path>) -> Result<TrainResponse> {
    let df = read_csv_path(saved_path.as_ref())?;
    let target = discover_target(&df)?;

    let (model_id, paths) = ctx.store().allocate()?;
    let report = TrainingPipeline::builder()
        .config(ctx.training_config().clone())
        .build()?
        .train(&df, target.as_deref(), &paths)?;

    info!(
        "Trained {} model {} from {}",
        report.kind.as_str(),
        model_id,
        saved_path.as_ref().display()
    );

    Ok(TrainResponse {
        model_id,
        kind: report.kind,
        target: report.target,
        native_path: paths.native.to_string_lossy().into_owned(),
        portable_path: report
            .portable_exported
            .then(|| paths.portable.to_string_lossy().into_owned()),
    })
}

/// Predict every row of an uploaded CSV with a stored model.
pub fn predict(ctx: &AppContext, model_id: &str, bytes: &[u8]) -> Result<PredictionResponse> {
    let df = read_csv_bytes(bytes)?;
    let response = InferenceDispatcher::new(ctx.store(), ctx.history()).predict(model_id, &df)?;
    Ok(response)
}

/// Stored prediction history of a model; empty when there is none.
pub fn get_history(ctx: &AppContext, model_id: &str) -> HistoryResponse {
    HistoryResponse {
        history: ctx.history().read(model_id),
    }
}
