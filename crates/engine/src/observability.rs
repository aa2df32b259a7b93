//! Observability infrastructure for the prediction engine
//!
//! Prometheus metrics for the prediction path: latency, outcome counters,
//! soft-degradation counters and loaded-model info.

use prometheus::{
    register_gauge_vec, register_histogram, register_int_gauge, GaugeVec, Histogram, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for prediction latency (in seconds); inference is
/// CPU-bound and sub-millisecond in the common case.
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntGauge,
    prediction_errors_total: IntGauge,
    unknown_category_substitutions_total: IntGauge,
    batch_requests_total: IntGauge,
    artifact_reloads_total: IntGauge,
    model_loaded: IntGauge,
    model_info: GaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "endo_engine_prediction_latency_seconds",
                "Time spent preprocessing and running the estimator",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_gauge!(
                "endo_engine_predictions_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_gauge!(
                "endo_engine_prediction_errors_total",
                "Total number of failed predictions"
            )
            .expect("Failed to register prediction_errors_total"),

            unknown_category_substitutions_total: register_int_gauge!(
                "endo_engine_unknown_category_substitutions_total",
                "Total number of unknown categorical values replaced by the first fitted class"
            )
            .expect("Failed to register unknown_category_substitutions_total"),

            batch_requests_total: register_int_gauge!(
                "endo_engine_batch_requests_total",
                "Total number of batch prediction calls"
            )
            .expect("Failed to register batch_requests_total"),

            artifact_reloads_total: register_int_gauge!(
                "endo_engine_artifact_reloads_total",
                "Total number of successful artifact (re)loads"
            )
            .expect("Failed to register artifact_reloads_total"),

            model_loaded: register_int_gauge!(
                "endo_engine_model_loaded",
                "Whether a complete artifact set is currently loaded (1) or not (0)"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "endo_engine_model_info",
                "Information about the currently loaded model",
                &["model_type"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn add_unknown_category_substitutions(&self, count: usize) {
        self.inner()
            .unknown_category_substitutions_total
            .add(count as i64);
    }

    pub fn inc_batch_requests(&self) {
        self.inner().batch_requests_total.inc();
    }

    pub fn inc_artifact_reloads(&self) {
        self.inner().artifact_reloads_total.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(if loaded { 1 } else { 0 });
    }

    /// Update the labeled model-info gauge, clearing the previous label set
    pub fn set_model_info(&self, model_type: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[model_type])
            .set(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_creation() {
        // Metrics register against the global Prometheus registry once per
        // process; this exercises the handle surface.
        let metrics = EngineMetrics::new();

        metrics.observe_prediction_latency(0.0004);
        metrics.inc_predictions();
        metrics.inc_prediction_errors();
        metrics.add_unknown_category_substitutions(2);
        metrics.inc_batch_requests();
        metrics.inc_artifact_reloads();
        metrics.set_model_loaded(true);
        metrics.set_model_info("SGDRegressor");
    }
}
