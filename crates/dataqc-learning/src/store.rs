//! Model artifact directory.
//!
//! Every trained model owns up to two files named after its identifier:
//! `{id}.bin` (native artifact, always written) and `{id}.graph.json`
//! (portable graph, only when export succeeded).

use crate::error::{LearningError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Length of a model identifier.
pub const MODEL_ID_LEN: usize = 8;

const NATIVE_EXTENSION: &str = "bin";
const PORTABLE_SUFFIX: &str = ".graph.json";

/// Where the artifacts of one model live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub native: PathBuf,
    pub portable: PathBuf,
}

/// Artifact chosen for a model, portable first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedArtifact {
    Portable(PathBuf),
    Native(PathBuf),
}

/// Generate a fresh model identifier: the first 8 hex digits of a v4 UUID.
pub fn new_model_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(MODEL_ID_LEN);
    id
}

/// Whether `id` can name files inside the store.
///
/// Only ASCII letters, digits, `-` and `_` are accepted, so an identifier
/// can never escape the store directory.
pub fn is_valid_model_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Directory holding model artifacts.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("Model store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact paths for `model_id`.
    ///
    /// An identifier that is not a valid file stem is reported as
    /// [`LearningError::ModelNotFound`].
    pub fn paths(&self, model_id: &str) -> Result<ArtifactPaths> {
        if !is_valid_model_id(model_id) {
            return Err(LearningError::ModelNotFound {
                model_id: model_id.to_string(),
            });
        }
        Ok(ArtifactPaths {
            native: self.dir.join(format!("{}.{}", model_id, NATIVE_EXTENSION)),
            portable: self.dir.join(format!("{}{}", model_id, PORTABLE_SUFFIX)),
        })
    }

    /// Allocate an unused identifier and its paths.
    pub fn allocate(&self) -> Result<(String, ArtifactPaths)> {
        loop {
            let id = new_model_id();
            let paths = self.paths(&id)?;
            if !paths.native.exists() && !paths.portable.exists() {
                return Ok((id, paths));
            }
        }
    }

    /// Find the artifact to serve `model_id`, preferring the portable graph.
    pub fn locate(&self, model_id: &str) -> Result<LocatedArtifact> {
        let paths = self.paths(model_id)?;
        if paths.portable.is_file() {
            Ok(LocatedArtifact::Portable(paths.portable))
        } else if paths.native.is_file() {
            Ok(LocatedArtifact::Native(paths.native))
        } else {
            Err(LearningError::ModelNotFound {
                model_id: model_id.to_string(),
            })
        }
    }
}
