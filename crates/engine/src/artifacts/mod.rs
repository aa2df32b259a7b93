//! Model artifact loading
//!
//! The offline training pipeline leaves four JSON files in a model
//! directory: the fitted estimator, the fitted scaler, the ordered feature
//! list and the per-column label encoders. Loading is all-or-nothing: a
//! partial artifact set is never a valid operating state.

mod encoder;
mod estimator;
mod scaler;

pub use encoder::{CategoricalEncoder, LabelEncoder};
pub use estimator::{Estimator, LinearEstimator};
pub use scaler::{Scaler, StandardScaler};

use crate::error::EngineError;
use crate::models::ModelInfo;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Artifact file names, fixed by convention with the training pipeline
pub const ARTIFACT_MODEL: &str = "best_model.json";
pub const ARTIFACT_SCALER: &str = "scaler.json";
pub const ARTIFACT_FEATURES: &str = "features.json";
pub const ARTIFACT_ENCODERS: &str = "label_encoders.json";

/// A complete, validated artifact set; immutable for its lifetime
pub struct ModelArtifacts {
    pub estimator: Box<dyn Estimator>,
    pub scaler: Box<dyn Scaler>,
    /// Training-time column order. Load-bearing: the scaler and estimator
    /// were fit against exactly this sequence, never re-sort it.
    pub feature_order: Vec<String>,
    pub encoders: HashMap<String, Box<dyn CategoricalEncoder>>,
    pub loaded_at: i64,
}

// The estimator/scaler/encoder fields are trait objects, so the shape
// summary stands in for them.
impl fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("model_type", &self.estimator.model_type())
            .field("feature_order", &self.feature_order)
            .field("encoded_columns", &self.encoders.len())
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

impl ModelArtifacts {
    /// Assemble and cross-validate an artifact set
    ///
    /// Any width or structure mismatch is fatal here rather than a
    /// per-request error: serving from an inconsistent set would produce
    /// silently wrong numbers.
    pub fn new(
        estimator: Box<dyn Estimator>,
        scaler: Box<dyn Scaler>,
        feature_order: Vec<String>,
        encoders: HashMap<String, Box<dyn CategoricalEncoder>>,
    ) -> Result<Self, EngineError> {
        if feature_order.is_empty() {
            return Err(EngineError::ArtifactMismatch {
                detail: "feature list is empty".to_string(),
            });
        }
        for (i, name) in feature_order.iter().enumerate() {
            if feature_order[..i].contains(name) {
                return Err(EngineError::ArtifactMismatch {
                    detail: format!("duplicate feature name `{name}` in feature list"),
                });
            }
        }
        if scaler.n_features() != feature_order.len() {
            return Err(EngineError::ArtifactMismatch {
                detail: format!(
                    "scaler fit on {} columns but feature list has {}",
                    scaler.n_features(),
                    feature_order.len()
                ),
            });
        }
        if estimator.n_features() != feature_order.len() {
            return Err(EngineError::ArtifactMismatch {
                detail: format!(
                    "estimator fit on {} columns but feature list has {}",
                    estimator.n_features(),
                    feature_order.len()
                ),
            });
        }
        for (column, encoder) in &encoders {
            if encoder.classes().is_empty() {
                return Err(EngineError::ArtifactMismatch {
                    detail: format!("encoder for `{column}` has no fitted classes"),
                });
            }
        }
        Ok(Self {
            estimator,
            scaler,
            feature_order,
            encoders,
            loaded_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Load the four artifacts from a model directory
    pub fn load(model_dir: &Path) -> Result<Self, EngineError> {
        let estimator: LinearEstimator = load_artifact(model_dir, ARTIFACT_MODEL)?;
        let scaler: StandardScaler = load_artifact(model_dir, ARTIFACT_SCALER)?;
        let feature_order: Vec<String> = load_artifact(model_dir, ARTIFACT_FEATURES)?;
        let raw_encoders: HashMap<String, LabelEncoder> =
            load_artifact(model_dir, ARTIFACT_ENCODERS)?;

        for entry in &scaler.scale {
            if !entry.is_finite() || *entry == 0.0 {
                return Err(EngineError::ArtifactMismatch {
                    detail: format!("scaler has non-finite or zero scale entry {entry}"),
                });
            }
        }

        let encoders: HashMap<String, Box<dyn CategoricalEncoder>> = raw_encoders
            .into_iter()
            .map(|(column, enc)| (column, Box::new(enc) as Box<dyn CategoricalEncoder>))
            .collect();

        let artifacts = Self::new(
            Box::new(estimator),
            Box::new(scaler),
            feature_order,
            encoders,
        )?;

        info!(
            model_dir = %model_dir.display(),
            model_type = artifacts.estimator.model_type(),
            features = artifacts.feature_order.len(),
            encoders = artifacts.encoders.len(),
            "Model artifacts loaded"
        );

        Ok(artifacts)
    }

    /// Introspection view for documentation endpoints
    pub fn info(&self) -> ModelInfo {
        let mut encoded_columns: Vec<String> = self.encoders.keys().cloned().collect();
        encoded_columns.sort();
        ModelInfo {
            model_type: self.estimator.model_type().to_string(),
            features: self.feature_order.clone(),
            features_count: self.feature_order.len(),
            encoded_columns,
            loaded_at: self.loaded_at,
        }
    }
}

fn load_artifact<T: DeserializeOwned>(model_dir: &Path, name: &str) -> Result<T, EngineError> {
    let path = model_dir.join(name);
    let bytes = std::fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::ArtifactMissing {
                name: name.to_string(),
                dir: model_dir.to_path_buf(),
            }
        } else {
            EngineError::ArtifactIo {
                name: name.to_string(),
                source: e,
            }
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|e| EngineError::ArtifactCorrupt {
        name: name.to_string(),
        source: e,
    })
}
