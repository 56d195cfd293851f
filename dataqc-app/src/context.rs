//! Application context.
//!
//! [`AppContext`] owns the three data directories and the handles built on
//! them. It is created once at startup and passed to every command.
//!
//! ```text
//! {data_dir}/
//! ├── uploads/              analyzed CSV uploads, "{uid8}_{file_name}"
//! ├── model_store/          "{id}.bin" and "{id}.graph.json"
//! └── prediction_history/   "{id}_history.json"
//! ```

use std::path::{Path, PathBuf};

use dataqc_learning::{ModelStore, PredictionHistory, TrainingConfig};
use tracing::info;

use crate::error::{AppError, Result};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const UPLOAD_DIR_NAME: &str = "uploads";
pub const MODEL_DIR_NAME: &str = "model_store";
pub const HISTORY_DIR_NAME: &str = "prediction_history";

/// Directories and stores shared by the commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    data_dir: PathBuf,
    upload_dir: PathBuf,
    store: ModelStore,
    history: PredictionHistory,
    training: TrainingConfig,
}

impl AppContext {
    #[must_use]
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn history(&self) -> &PredictionHistory {
        &self.history
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }
}

/// Builder for [`AppContext`].
#[derive(Debug, Clone, Default)]
pub struct AppContextBuilder {
    data_dir: Option<PathBuf>,
    training: Option<TrainingConfig>,
}

impl AppContextBuilder {
    /// Root directory for uploads, models and history (default: `./data`).
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Training configuration (default: [`TrainingConfig::default()`]).
    #[must_use]
    pub fn training_config(mut self, config: TrainingConfig) -> Self {
        self.training = Some(config);
        self
    }

    /// Validate the settings and create the directories.
    pub fn build(self) -> Result<AppContext> {
        let data_dir = self
            .data_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        if data_dir.as_os_str().is_empty() {
            return Err(AppError::InvalidConfig(
                "data_dir must not be empty".to_string(),
            ));
        }

        let training = self.training.unwrap_or_default();
        training.validate()?;

        let upload_dir = data_dir.join(UPLOAD_DIR_NAME);
        std::fs::create_dir_all(&upload_dir)?;
        let store = ModelStore::open(data_dir.join(MODEL_DIR_NAME))?;
        let history = PredictionHistory::open(data_dir.join(HISTORY_DIR_NAME))?;

        info!("Data directory: {}", data_dir.display());

        Ok(AppContext {
            data_dir,
            upload_dir,
            store,
            history,
            training,
        })
    }
}
