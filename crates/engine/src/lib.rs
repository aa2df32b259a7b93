//! Prediction engine for the endometriosis regression model
//!
//! This crate provides the core functionality for:
//! - Loading fitted model artifacts from a directory
//! - Preprocessing raw records into the training-time column layout
//! - Running the regression estimator with clamping and confidence bucketing
//! - Batch prediction with per-record failure isolation
//! - Prometheus metrics for the prediction path

pub mod artifacts;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod preprocess;

pub use artifacts::{
    CategoricalEncoder, Estimator, LabelEncoder, LinearEstimator, ModelArtifacts, Scaler,
    StandardScaler,
};
pub use engine::PredictionEngine;
pub use error::EngineError;
pub use models::{
    BatchItem, BatchResult, Confidence, FeatureValue, InputRecord, ModelInfo, PredictionResult,
    SoftWarning,
};
pub use observability::EngineMetrics;
