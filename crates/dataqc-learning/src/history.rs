//! Per-model prediction history.
//!
//! Each model has one JSON file `{id}_history.json` holding its most recent
//! [`MAX_HISTORY_ENTRIES`] entries, oldest first. Appends are
//! read-modify-write without locking.

use crate::error::{LearningError, Result};
use crate::store::is_valid_model_id;
use crate::types::{HistoryEntry, PredictionKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Entries kept per model.
pub const MAX_HISTORY_ENTRIES: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Directory of history files.
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    dir: PathBuf,
}

impl PredictionHistory {
    /// Open the history directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// History file of `model_id`.
    pub fn path(&self, model_id: &str) -> PathBuf {
        self.dir.join(format!("{}_history.json", model_id))
    }

    /// Record a prediction and return the stored sequence.
    ///
    /// A missing file starts an empty history. An unreadable or corrupt file
    /// is an error and is left untouched.
    pub fn append(
        &self,
        model_id: &str,
        value: f64,
        kind: PredictionKind,
    ) -> Result<Vec<HistoryEntry>> {
        if !is_valid_model_id(model_id) {
            return Err(LearningError::ModelNotFound {
                model_id: model_id.to_string(),
            });
        }
        let path = self.path(model_id);
        let mut entries: Vec<HistoryEntry> = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            Vec::new()
        };

        entries.push(HistoryEntry {
            timestamp: chrono::Local::now()
                .naive_local()
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            value,
            kind,
        });
        if entries.len() > MAX_HISTORY_ENTRIES {
            entries.drain(..entries.len() - MAX_HISTORY_ENTRIES);
        }

        std::fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
        debug!(
            "Recorded {:?} for model {} ({} entries)",
            kind,
            model_id,
            entries.len()
        );
        Ok(entries)
    }

    /// Stored history of `model_id`, empty when absent or unreadable.
    pub fn read(&self, model_id: &str) -> Vec<HistoryEntry> {
        let path = self.path(model_id);
        if !is_valid_model_id(model_id) || !path.exists() {
            return Vec::new();
        }

        let parsed: Result<Vec<HistoryEntry>> = std::fs::read(&path)
            .map_err(LearningError::from)
            .and_then(|bytes| Ok(serde_json::from_slice(&bytes)?));
        match parsed {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring unreadable history {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}
