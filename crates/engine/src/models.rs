//! Core data models for the prediction engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw feature value as supplied by the caller
///
/// Numbers arrive as JSON numbers; categorical values as strings. Coercions
/// between the two happen in the preprocessing pipeline, matching the
/// behavior the model was trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value, parsing strings when possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// String form used for categorical encoding
    ///
    /// Whole numbers render without a fractional part ("1", not "1.0") so
    /// flag columns match the string classes the encoder was fit on.
    pub fn as_category(&self) -> String {
        match self {
            FeatureValue::Text(s) => s.clone(),
            FeatureValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

/// A flat record of feature name to raw value
///
/// Key order carries no meaning; keys outside the model's feature order are
/// tolerated and ignored.
pub type InputRecord = HashMap<String, FeatureValue>;

/// Coarse confidence bucket over the clamped score
///
/// Fixed tri-band partition of [0, 1]: scores below 0.33 are Low, below
/// 0.67 Medium, the rest High. Boundaries are inclusive on the upper band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Bucket a clamped score
    pub fn from_score(score: f64) -> Self {
        if score < 0.33 {
            Confidence::Low
        } else if score < 0.67 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }
}

/// Soft-degradation marker for an unknown categorical value
///
/// Attached to the result instead of failing the prediction: the pipeline
/// substituted the encoder's first known class and carried on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftWarning {
    pub feature: String,
    pub unknown_value: String,
    pub substituted: String,
}

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted probability-like score, clamped to [0, 1]
    pub score: f64,
    /// Confidence bucket derived from the score
    pub confidence: Confidence,
    /// Soft-degradation warnings raised while preprocessing this record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SoftWarning>,
}

/// One entry of a batch result
///
/// `index` is the 1-based position of the record in the request; it is not
/// a durable identifier. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn ok(index: usize, result: PredictionResult) -> Self {
        Self {
            index,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }
}

/// Outcome of a batch prediction; partial failure is a first-class state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub total_processed: usize,
    pub success: bool,
}

impl BatchResult {
    pub fn new(items: Vec<BatchItem>) -> Self {
        let total_processed = items.len();
        let success = items.iter().all(BatchItem::is_ok);
        Self {
            items,
            total_processed,
            success,
        }
    }
}

/// Introspection view of the loaded artifact set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub features: Vec<String>,
    pub features_count: usize,
    pub encoded_columns: Vec<String>,
    pub loaded_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_partition() {
        assert_eq!(Confidence::from_score(0.10), Confidence::Low);
        assert_eq!(Confidence::from_score(0.33), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.669999), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.67), Confidence::High);
        assert_eq!(Confidence::from_score(0.0), Confidence::Low);
        assert_eq!(Confidence::from_score(1.0), Confidence::High);
    }

    #[test]
    fn test_feature_value_numeric_coercion() {
        assert_eq!(FeatureValue::Number(6.5).as_f64(), Some(6.5));
        assert_eq!(FeatureValue::from("23.5").as_f64(), Some(23.5));
        assert_eq!(FeatureValue::from("abnormal").as_f64(), None);
    }

    #[test]
    fn test_feature_value_category_form() {
        assert_eq!(FeatureValue::Number(1.0).as_category(), "1");
        assert_eq!(FeatureValue::Number(6.5).as_category(), "6.5");
        assert_eq!(FeatureValue::from("Yes").as_category(), "Yes");
    }

    #[test]
    fn test_batch_result_success_flag() {
        let ok = PredictionResult {
            score: 0.5,
            confidence: Confidence::Medium,
            warnings: Vec::new(),
        };
        let all_ok = BatchResult::new(vec![
            BatchItem::ok(1, ok.clone()),
            BatchItem::ok(2, ok.clone()),
        ]);
        assert!(all_ok.success);
        assert_eq!(all_ok.total_processed, 2);

        let partial = BatchResult::new(vec![
            BatchItem::ok(1, ok),
            BatchItem::failed(2, "missing required feature `Age`"),
        ]);
        assert!(!partial.success);
        assert_eq!(partial.total_processed, 2);
    }

    #[test]
    fn test_untagged_deserialization() {
        let record: InputRecord =
            serde_json::from_str(r#"{"Age": 32, "Diagnosis_Stage": "II"}"#).unwrap();
        assert_eq!(record["Age"], FeatureValue::Number(32.0));
        assert_eq!(record["Diagnosis_Stage"], FeatureValue::from("II"));
    }
}
