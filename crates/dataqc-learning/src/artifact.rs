//! Native model artifacts.
//!
//! A fitted model is persisted as a bincode-encoded [`Envelope`]: magic
//! bytes, a format version, the model kind, the training time and the
//! encoded [`ModelArtifact`] guarded by an FNV-1a checksum.

use crate::error::{LearningError, Result};
use crate::models::IsolationForest;
use crate::pipeline::SupervisedPipeline;
use crate::types::ModelKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Magic bytes opening every native artifact.
pub const ARTIFACT_MAGIC: [u8; 4] = *b"DQCM";

/// Current envelope format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A fitted model as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelArtifact {
    /// Preprocessing and classifier for a target column.
    Supervised(SupervisedPipeline),
    /// Anomaly detector over numeric columns.
    Unsupervised {
        detector: IsolationForest,
        /// Columns the detector was fitted on, in matrix order.
        feature_columns: Vec<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    kind: ModelKind,
    trained_at: String,
    model_data: Vec<u8>,
    checksum: u64,
}

fn checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
    const FNV_PRIME: u64 = 1_099_511_628_211;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

impl ModelArtifact {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Supervised(_) => ModelKind::Supervised,
            Self::Unsupervised { .. } => ModelKind::Unsupervised,
        }
    }

    /// Encode the artifact with its envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let model_data = bincode::serialize(self)?;
        let envelope = Envelope {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            kind: self.kind(),
            trained_at: chrono::Local::now().to_rfc3339(),
            checksum: checksum(&model_data),
            model_data,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    /// Decode an artifact, checking magic, version, checksum and kind.
    ///
    /// Every failure is reported as [`LearningError::ModelLoad`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = bincode::deserialize(bytes)
            .map_err(|e| LearningError::ModelLoad(format!("invalid artifact: {}", e)))?;

        if envelope.magic != ARTIFACT_MAGIC {
            return Err(LearningError::ModelLoad(
                "not a DataQC model artifact".to_string(),
            ));
        }
        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(LearningError::ModelLoad(format!(
                "unsupported artifact version {} (expected {})",
                envelope.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if checksum(&envelope.model_data) != envelope.checksum {
            return Err(LearningError::ModelLoad(
                "artifact checksum mismatch".to_string(),
            ));
        }

        let artifact: ModelArtifact = bincode::deserialize(&envelope.model_data)
            .map_err(|e| LearningError::ModelLoad(format!("invalid model data: {}", e)))?;
        if artifact.kind() != envelope.kind {
            return Err(LearningError::ModelLoad(format!(
                "artifact declares {} but holds a {} model",
                envelope.kind.as_str(),
                artifact.kind().as_str()
            )));
        }

        debug!(
            "Decoded {} artifact trained at {}",
            envelope.kind.as_str(),
            envelope.trained_at
        );
        Ok(artifact)
    }

    /// Write the artifact to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Read an artifact from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| LearningError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        let mut bytes = Vec::new();
        BufReader::new(file)
            .read_to_end(&mut bytes)
            .map_err(|e| LearningError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn detector_artifact() -> ModelArtifact {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 50.0]).unwrap();
        ModelArtifact::Unsupervised {
            detector: IsolationForest::fit(&x, 5, 256, 42).unwrap(),
            feature_columns: vec!["value".to_string()],
        }
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.bin");
        let artifact = detector_artifact();

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
        assert_eq!(loaded.kind(), ModelKind::Unsupervised);
    }

    #[test]
    fn test_rejects_foreign_bytes() {
        let err = ModelArtifact::from_bytes(b"definitely not a model").unwrap_err();
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let mut envelope: Envelope =
            bincode::deserialize(&detector_artifact().to_bytes().unwrap()).unwrap();
        envelope.magic = *b"KOLM";
        let bytes = bincode::serialize(&envelope).unwrap();
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("not a DataQC model artifact"));
    }

    #[test]
    fn test_rejects_corrupted_payload() {
        let mut envelope: Envelope =
            bincode::deserialize(&detector_artifact().to_bytes().unwrap()).unwrap();
        if let Some(byte) = envelope.model_data.last_mut() {
            *byte ^= 0xFF;
        }
        let bytes = bincode::serialize(&envelope).unwrap();
        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let mut envelope: Envelope =
            bincode::deserialize(&detector_artifact().to_bytes().unwrap()).unwrap();
        envelope.kind = ModelKind::Supervised;
        let bytes = bincode::serialize(&envelope).unwrap();
        assert_eq!(
            ModelArtifact::from_bytes(&bytes).unwrap_err().error_code(),
            "MODEL_LOAD_ERROR"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = ModelArtifact::load(tmp.path().join("absent.bin")).unwrap_err();
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }
}
