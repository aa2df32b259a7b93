//! Error taxonomy for the prediction engine
//!
//! Fatal artifact errors (`ArtifactMissing`, `ArtifactIo`, `ArtifactCorrupt`,
//! `ArtifactMismatch`) keep the engine in the Unloaded state; per-record
//! errors (`MissingFeature`, `InvalidValue`, `OutOfRange`,
//! `PredictionFailure`) are isolated per item in batch mode. Unknown
//! categorical values are not errors at all: they degrade softly and surface
//! as [`crate::models::SoftWarning`] on the result.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by artifact loading, preprocessing and prediction
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required artifact file is absent from the model directory
    #[error("model artifact `{name}` not found in {}", .dir.display())]
    ArtifactMissing { name: String, dir: PathBuf },

    /// An artifact file exists but could not be read
    #[error("failed to read model artifact `{name}`: {source}")]
    ArtifactIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// An artifact file exists but does not deserialize into the expected shape
    #[error("model artifact `{name}` failed to deserialize: {source}")]
    ArtifactCorrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact set is internally inconsistent (e.g. scaler width vs feature list)
    #[error("model artifacts are inconsistent: {detail}")]
    ArtifactMismatch { detail: String },

    /// A record lacks a feature the model was trained on
    #[error("record {record}: missing required feature `{feature}`")]
    MissingFeature { record: usize, feature: String },

    /// A numeric column received a value that cannot be coerced to a number
    #[error("record {record}: feature `{feature}` has non-numeric value `{value}`")]
    InvalidValue {
        record: usize,
        feature: String,
        value: String,
    },

    /// A value fell outside the known clinical range for its feature
    #[error(
        "record {record}: feature `{feature}` value {value} outside allowed range [{min}, {max}]"
    )]
    OutOfRange {
        record: usize,
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Prediction was requested while no artifact set is loaded
    #[error("no model artifacts loaded, prediction unavailable")]
    ModelUnavailable,

    /// The estimator call itself failed
    #[error("prediction failed for record {record}: {detail}")]
    PredictionFailure { record: usize, detail: String },

    /// Invariant violation inside the engine (lock poisoning and the like)
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True for errors that block all prediction until a successful (re)load
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ArtifactMissing { .. }
                | EngineError::ArtifactIo { .. }
                | EngineError::ArtifactCorrupt { .. }
                | EngineError::ArtifactMismatch { .. }
                | EngineError::ModelUnavailable
        )
    }

    /// True for errors caused by the caller's record rather than the engine
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            EngineError::MissingFeature { .. }
                | EngineError::InvalidValue { .. }
                | EngineError::OutOfRange { .. }
        )
    }

    /// Re-stamp the record offset so batch items point at their position in
    /// the original request rather than inside a singleton call.
    pub fn at_record(self, index: usize) -> Self {
        match self {
            EngineError::MissingFeature { feature, .. } => EngineError::MissingFeature {
                record: index,
                feature,
            },
            EngineError::InvalidValue { feature, value, .. } => EngineError::InvalidValue {
                record: index,
                feature,
                value,
            },
            EngineError::OutOfRange {
                feature,
                value,
                min,
                max,
                ..
            } => EngineError::OutOfRange {
                record: index,
                feature,
                value,
                min,
                max,
            },
            EngineError::PredictionFailure { detail, .. } => EngineError::PredictionFailure {
                record: index,
                detail,
            },
            other => other,
        }
    }
}
