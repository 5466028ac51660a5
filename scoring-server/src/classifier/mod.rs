//! Classifier artifact
//!
//! The pre-trained fraud model is loaded once at startup and shared by
//! every request. A `.onnx` file runs through ONNX Runtime; anything else
//! is read as a JSON artifact (logistic or decision tree), which are pure
//! functions of the record.

mod logistic;
mod onnx;
mod tree;

pub use logistic::LogisticModel;
pub use onnx::OnnxClassifier;
pub use tree::{DecisionTree, TreeNode};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::models::FeatureRecord;

/// Opaque decision function consumed by the scoring endpoint
pub trait Classifier: Send + Sync {
    /// `true` means fraud
    fn predict(&self, record: &FeatureRecord) -> Result<bool, ClassifierError>;
}

/// Model failed while evaluating a record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("classifier failure: {0}")]
pub struct ClassifierError(pub String);

/// Artifact could not be turned into a usable model
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("inconsistent model artifact: {0}")]
    Invalid(String),
    #[error("cannot build ONNX session from {0}")]
    Onnx(String),
}

/// On-disk artifact, tagged by model kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
    DecisionTree(DecisionTree),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Logistic(_) => "logistic",
            ModelArtifact::DecisionTree(_) => "decision_tree",
        }
    }

    fn check(&self) -> Result<(), LoadError> {
        match self {
            ModelArtifact::Logistic(m) => m.check(),
            ModelArtifact::DecisionTree(t) => t.check(),
        }
    }

    fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            ModelArtifact::Logistic(m) => Arc::new(m),
            ModelArtifact::DecisionTree(t) => Arc::new(t),
        }
    }
}

/// What was loaded, for logs and `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kind: &'static str,
    pub fingerprint: String,
}

/// Parse and validate an artifact from raw bytes
pub fn from_bytes(bytes: &[u8]) -> Result<(Arc<dyn Classifier>, ModelInfo), LoadError> {
    let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
    artifact.check()?;

    let info = ModelInfo {
        kind: artifact.kind(),
        fingerprint: format!("{:x}", Sha256::digest(bytes)),
    };

    Ok((artifact.into_classifier(), info))
}

/// Load the artifact from disk, by extension
pub fn load(path: &Path) -> Result<(Arc<dyn Classifier>, ModelInfo), LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("onnx")) {
        let model = OnnxClassifier::load(path)?;
        let info = ModelInfo {
            kind: "onnx",
            fingerprint: format!("{:x}", Sha256::digest(&bytes)),
        };
        return Ok((Arc::new(model), info));
    }

    from_bytes(&bytes)
}
