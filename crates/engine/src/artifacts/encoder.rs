//! Fitted categorical encoders

use serde::{Deserialize, Serialize};

/// A fitted mapping from category labels to numeric codes
///
/// `classes` is the fixed set of categories seen during fitting; values
/// outside it are handled by the preprocessing pipeline's documented
/// first-class substitution, not here.
pub trait CategoricalEncoder: Send + Sync {
    /// Encode a category label, `None` if it was not seen during fitting
    fn transform(&self, value: &str) -> Option<f64>;

    /// The categories seen during fitting, in fitted order
    fn classes(&self) -> &[String];
}

/// Ordinal label encoder: a category's code is its position in `classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }
}

impl CategoricalEncoder for LabelEncoder {
    fn transform(&self, value: &str) -> Option<f64> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|i| i as f64)
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}
