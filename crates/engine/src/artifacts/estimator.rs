//! Fitted estimator trait and the linear implementation shipped by training

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A fitted regressor
///
/// The only capability the engine needs from a model: map a numeric matrix
/// (rows in training column order, already scaled) to one raw output per
/// row. Raw outputs may overshoot [0, 1]; clamping is the engine's job.
pub trait Estimator: Send + Sync {
    fn predict(&self, matrix: &[Vec<f64>]) -> Result<Vec<f64>, EngineError>;

    /// Human-readable model family, for introspection endpoints
    fn model_type(&self) -> &str;

    /// Number of input columns the model was fit on
    fn n_features(&self) -> usize;
}

fn default_model_type() -> String {
    "SGDRegressor".to_string()
}

/// Linear model fit by gradient descent: `y = coefficients . x + intercept`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearEstimator {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearEstimator {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            model_type: default_model_type(),
            coefficients,
            intercept,
        }
    }
}

impl Estimator for LinearEstimator {
    fn predict(&self, matrix: &[Vec<f64>]) -> Result<Vec<f64>, EngineError> {
        let mut outputs = Vec::with_capacity(matrix.len());
        for (i, row) in matrix.iter().enumerate() {
            if row.len() != self.coefficients.len() {
                return Err(EngineError::PredictionFailure {
                    record: i,
                    detail: format!(
                        "estimator expects {} columns, matrix row has {}",
                        self.coefficients.len(),
                        row.len()
                    ),
                });
            }
            let dot: f64 = row
                .iter()
                .zip(self.coefficients.iter())
                .map(|(x, c)| x * c)
                .sum();
            outputs.push(dot + self.intercept);
        }
        Ok(outputs)
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_prediction() {
        let est = LinearEstimator::new(vec![0.5, -0.25], 0.1);
        let out = est.predict(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.1).abs() < 1e-12); // 0.5 - 0.5 + 0.1
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let est = LinearEstimator::new(vec![0.5, -0.25], 0.1);
        let err = est.predict(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, EngineError::PredictionFailure { record: 0, .. }));
    }

    #[test]
    fn test_deserialize_defaults_model_type() {
        let est: LinearEstimator =
            serde_json::from_str(r#"{"coefficients": [0.1], "intercept": 0.0}"#).unwrap();
        assert_eq!(est.model_type, "SGDRegressor");
    }
}
