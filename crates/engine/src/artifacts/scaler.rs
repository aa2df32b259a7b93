//! Fitted feature scaler

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A fitted per-column transform applied identically at train and inference
/// time. Never re-fit at request time.
pub trait Scaler: Send + Sync {
    /// Transform the matrix in place; rows must match the fitted width
    fn transform(&self, matrix: &mut [Vec<f64>]) -> Result<(), EngineError>;

    /// Number of columns the scaler was fit on
    fn n_features(&self) -> usize;
}

/// Standardization fit at training time: `(x - mean) / scale` per column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    /// Identity scaler of the given width, used by tests and smoke fixtures
    pub fn identity(width: usize) -> Self {
        Self {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, matrix: &mut [Vec<f64>]) -> Result<(), EngineError> {
        for (i, row) in matrix.iter_mut().enumerate() {
            if row.len() != self.mean.len() {
                return Err(EngineError::PredictionFailure {
                    record: i,
                    detail: format!(
                        "scaler expects {} columns, matrix row has {}",
                        self.mean.len(),
                        row.len()
                    ),
                });
            }
            for (j, value) in row.iter_mut().enumerate() {
                *value = (*value - self.mean[j]) / self.scale[j];
            }
        }
        Ok(())
    }

    fn n_features(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardization() {
        let scaler = StandardScaler::new(vec![10.0, 0.5], vec![5.0, 0.5]);
        let mut matrix = vec![vec![15.0, 1.0]];
        scaler.transform(&mut matrix).unwrap();
        assert!((matrix[0][0] - 1.0).abs() < 1e-12);
        assert!((matrix[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identity_is_noop() {
        let scaler = StandardScaler::identity(3);
        let mut matrix = vec![vec![1.0, -2.0, 0.5]];
        scaler.transform(&mut matrix).unwrap();
        assert_eq!(matrix[0], vec![1.0, -2.0, 0.5]);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let scaler = StandardScaler::identity(2);
        let mut matrix = vec![vec![1.0, 2.0, 3.0]];
        let err = scaler.transform(&mut matrix).unwrap_err();
        assert!(matches!(err, EngineError::PredictionFailure { .. }));
    }
}
