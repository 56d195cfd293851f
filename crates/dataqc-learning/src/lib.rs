//! Model training, portable export, inference and prediction history for DataQC.
//!
//! # Overview
//!
//! - **Training**: [`TrainingPipeline`] fits a tree-ensemble classifier when a
//!   target column is known, an [`IsolationForest`] otherwise
//! - **Artifacts**: [`ModelArtifact`] (native, bincode) and [`ModelGraph`]
//!   (portable, ONNX-style JSON) stored in a [`ModelStore`]
//! - **Inference**: [`InferenceDispatcher`] runs the portable graph when one
//!   exists and falls back to the native artifact
//! - **History**: [`PredictionHistory`] keeps the last ten trend values per model
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dataqc_learning::{
//!     InferenceDispatcher, ModelStore, PredictionHistory, TrainingPipeline,
//! };
//!
//! let store = ModelStore::open("data/model_store")?;
//! let history = PredictionHistory::open("data/prediction_history")?;
//!
//! let (model_id, paths) = store.allocate()?;
//! TrainingPipeline::builder().build()?.train(&train_df, Some("clicked"), &paths)?;
//!
//! let response = InferenceDispatcher::new(&store, &history).predict(&model_id, &new_df)?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod portable;
pub mod preprocessing;
pub mod split;
pub mod store;
pub mod types;

pub use artifact::{ARTIFACT_FORMAT_VERSION, ARTIFACT_MAGIC, ModelArtifact};
pub use config::{ClassifierChoice, TrainingConfig, TrainingConfigBuilder};
pub use error::{LearningError, Result};
pub use history::{MAX_HISTORY_ENTRIES, PredictionHistory};
pub use inference::InferenceDispatcher;
pub use models::{Classifier, ClassifierKind, IsolationForest};
pub use pipeline::{SupervisedPipeline, TrainingPipeline, TrainingPipelineBuilder};
pub use portable::{InferenceSession, ModelGraph, PORTABLE_INPUT_NAME, export_graph};
pub use store::{ArtifactPaths, LocatedArtifact, ModelStore, is_valid_model_id, new_model_id};
pub use types::{
    ClassLabel, HistoryEntry, ModelKind, PredictionKind, PredictionOutput, PredictionResponse,
    TrainingReport,
};
