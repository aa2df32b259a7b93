//! Prediction engine orchestration
//!
//! Owns the artifact lifecycle and the predict path. The engine has two
//! operating states: Unloaded (no artifact set, every predict fails fast
//! with `ModelUnavailable`) and Ready. A (re)load builds the complete new
//! artifact set off to the side and publishes it with a single swap, so
//! concurrent readers never observe a partial set and a failed reload
//! leaves the previous set serving.

use crate::artifacts::ModelArtifacts;
use crate::error::EngineError;
use crate::models::{BatchItem, BatchResult, Confidence, InputRecord, ModelInfo, PredictionResult};
use crate::observability::EngineMetrics;
use crate::preprocess;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The prediction engine
///
/// Stateless per call beyond the shared, read-only artifact snapshot;
/// prediction is CPU-bound and safe to run concurrently from many callers.
pub struct PredictionEngine {
    model_dir: PathBuf,
    artifacts: RwLock<Option<Arc<ModelArtifacts>>>,
    metrics: EngineMetrics,
}

impl PredictionEngine {
    /// Create an engine in the Unloaded state, backed by a model directory
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            artifacts: RwLock::new(None),
            metrics: EngineMetrics::new(),
        }
    }

    /// Create a Ready engine from an already-assembled artifact set
    ///
    /// For embedders that manage artifacts themselves; `reload` still reads
    /// from the backing directory and will fail if it holds no artifacts.
    pub fn with_artifacts(model_dir: impl Into<PathBuf>, artifacts: ModelArtifacts) -> Self {
        let engine = Self::new(model_dir);
        engine.publish(artifacts);
        engine
    }

    /// Load the artifact set from the backing directory
    ///
    /// All-or-nothing: on any failure the engine keeps whatever set it was
    /// serving before (possibly none) and the error is returned.
    pub fn load(&self) -> Result<(), EngineError> {
        let artifacts = ModelArtifacts::load(&self.model_dir)?;
        self.publish(artifacts);
        Ok(())
    }

    /// Explicit reload action; identical atomic-swap semantics as `load`
    pub fn reload(&self) -> Result<(), EngineError> {
        let was_ready = self.is_ready();
        match self.load() {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    error = %e,
                    previous_set_retained = was_ready,
                    "Artifact reload failed"
                );
                Err(e)
            }
        }
    }

    fn publish(&self, artifacts: ModelArtifacts) {
        let model_type = artifacts.estimator.model_type().to_string();
        let features = artifacts.feature_order.len();
        {
            // Swap only after the full set validated; readers holding the
            // previous Arc finish on the old snapshot.
            let mut guard = match self.artifacts.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = Some(Arc::new(artifacts));
        }
        self.metrics.set_model_loaded(true);
        self.metrics.set_model_info(&model_type);
        self.metrics.inc_artifact_reloads();
        info!(model_type = %model_type, features, "Artifact set published");
    }

    fn snapshot(&self) -> Result<Arc<ModelArtifacts>, EngineError> {
        let guard = self
            .artifacts
            .read()
            .map_err(|_| EngineError::Internal("artifact lock poisoned".to_string()))?;
        guard.as_ref().cloned().ok_or(EngineError::ModelUnavailable)
    }

    /// Whether a complete artifact set is loaded
    pub fn is_ready(&self) -> bool {
        self.artifacts
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Training-time column order, for introspection endpoints
    pub fn feature_order(&self) -> Option<Vec<String>> {
        self.snapshot().ok().map(|a| a.feature_order.clone())
    }

    /// Introspection view of the loaded model, if any
    pub fn model_info(&self) -> Option<ModelInfo> {
        self.snapshot().ok().map(|a| a.info())
    }

    /// Predict a single record
    ///
    /// Fails fast with `ModelUnavailable` before any transform work when
    /// Unloaded. The raw estimator output is clamped to [0, 1] (linear
    /// models overshoot; that is policy-clipped, not an error) and bucketed
    /// into the fixed tri-band confidence partition.
    pub fn predict(&self, record: &InputRecord) -> Result<PredictionResult, EngineError> {
        let artifacts = self.snapshot()?;
        let start = Instant::now();
        let result = self.predict_on(&artifacts, record);
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        match &result {
            Ok(prediction) => {
                self.metrics.inc_predictions();
                debug!(
                    score = prediction.score,
                    confidence = ?prediction.confidence,
                    warnings = prediction.warnings.len(),
                    elapsed_us = start.elapsed().as_micros(),
                    "Prediction completed"
                );
            }
            Err(_) => self.metrics.inc_prediction_errors(),
        }
        result
    }

    /// Predict a batch of records with per-record failure isolation
    ///
    /// One record's failure never aborts the others; its item carries the
    /// error instead of a result. Output order matches input order and item
    /// indices are the 1-based request positions. Only the Unloaded state
    /// fails the call as a whole.
    pub fn predict_batch(&self, records: &[InputRecord]) -> Result<BatchResult, EngineError> {
        let artifacts = self.snapshot()?;
        self.metrics.inc_batch_requests();

        let items = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let start = Instant::now();
                let outcome = self.predict_on(&artifacts, record);
                self.metrics
                    .observe_prediction_latency(start.elapsed().as_secs_f64());
                match outcome {
                    Ok(prediction) => {
                        self.metrics.inc_predictions();
                        BatchItem::ok(i + 1, prediction)
                    }
                    Err(e) => {
                        self.metrics.inc_prediction_errors();
                        // Same 1-based position in the message as in the
                        // item index.
                        BatchItem::failed(i + 1, e.at_record(i + 1).to_string())
                    }
                }
            })
            .collect();

        Ok(BatchResult::new(items))
    }

    fn predict_on(
        &self,
        artifacts: &ModelArtifacts,
        record: &InputRecord,
    ) -> Result<PredictionResult, EngineError> {
        let prep = preprocess::transform_batch(artifacts, std::slice::from_ref(record))?;
        let outputs = artifacts.estimator.predict(&prep.matrix)?;
        let raw = outputs
            .first()
            .copied()
            .ok_or_else(|| EngineError::PredictionFailure {
                record: 0,
                detail: "estimator returned no output".to_string(),
            })?;

        let warnings = prep.row_warnings.into_iter().next().unwrap_or_default();
        if !warnings.is_empty() {
            self.metrics
                .add_unknown_category_substitutions(warnings.len());
        }

        let score = raw.clamp(0.0, 1.0);
        Ok(PredictionResult {
            score,
            confidence: Confidence::from_score(score),
            warnings,
        })
    }
}
