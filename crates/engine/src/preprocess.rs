//! Preprocessing pipeline
//!
//! Converts raw input records into the numeric matrix the estimator was fit
//! on. The step order is load-bearing and mirrors training exactly:
//! presence check, projection into training column order, categorical
//! encoding, scaling. The batch is atomic for presence/shape violations;
//! unknown categorical values degrade softly per record.

use crate::artifacts::ModelArtifacts;
use crate::error::EngineError;
use crate::models::{InputRecord, SoftWarning};
use tracing::warn;

/// Known clinical value ranges, re-checked here because the engine must
/// tolerate callers that bypass the serving layer's schema validation.
const CLINICAL_RANGES: &[(&str, f64, f64)] = &[
    ("Age", 18.0, 100.0),
    ("Menstrual_Irregularity", 0.0, 1.0),
    ("Chronic_Pain_Level", 0.0, 10.0),
    ("Hormone_Level_Abnormality", 0.0, 1.0),
    ("Infertility", 0.0, 1.0),
    ("BMI", 10.0, 60.0),
];

/// Output of the pipeline: one matrix row per input record, plus any
/// soft-degradation warnings raised for that row.
#[derive(Debug)]
pub struct Preprocessed {
    pub matrix: Vec<Vec<f64>>,
    pub row_warnings: Vec<Vec<SoftWarning>>,
}

/// Run the full pipeline over a batch of records
///
/// Row count equals the record count, column count equals the feature
/// order length. Keys outside the feature order are ignored silently.
pub fn transform_batch(
    artifacts: &ModelArtifacts,
    records: &[InputRecord],
) -> Result<Preprocessed, EngineError> {
    // Presence check for the whole batch before any transform work
    for (i, record) in records.iter().enumerate() {
        for feature in &artifacts.feature_order {
            if !record.contains_key(feature) {
                return Err(EngineError::MissingFeature {
                    record: i,
                    feature: feature.clone(),
                });
            }
        }
    }

    let mut matrix = Vec::with_capacity(records.len());
    let mut row_warnings = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let mut row = Vec::with_capacity(artifacts.feature_order.len());
        let mut warnings = Vec::new();

        for feature in &artifacts.feature_order {
            let value = &record[feature];

            if let Some(encoder) = artifacts.encoders.get(feature) {
                let category = value.as_category();
                let encoded = match encoder.transform(&category) {
                    Some(code) => code,
                    None => {
                        // Documented degradation: fall back to the first
                        // fitted class and flag it, never crash or hide it.
                        let substituted = encoder.classes()[0].clone();
                        warn!(
                            record = i,
                            feature = %feature,
                            unknown_value = %category,
                            substituted = %substituted,
                            "Unknown category, substituting first fitted class"
                        );
                        let code = encoder
                            .transform(&substituted)
                            .ok_or_else(|| EngineError::Internal(format!(
                                "encoder for `{feature}` cannot encode its own first class"
                            )))?;
                        warnings.push(SoftWarning {
                            feature: feature.clone(),
                            unknown_value: category,
                            substituted,
                        });
                        code
                    }
                };
                row.push(encoded);
            } else {
                let number = value.as_f64().ok_or_else(|| EngineError::InvalidValue {
                    record: i,
                    feature: feature.clone(),
                    value: value.as_category(),
                })?;
                check_range(i, feature, number)?;
                row.push(number);
            }
        }

        matrix.push(row);
        row_warnings.push(warnings);
    }

    artifacts.scaler.transform(&mut matrix)?;

    Ok(Preprocessed {
        matrix,
        row_warnings,
    })
}

fn check_range(record: usize, feature: &str, value: f64) -> Result<(), EngineError> {
    for (name, min, max) in CLINICAL_RANGES {
        if *name == feature {
            if value < *min || value > *max || !value.is_finite() {
                return Err(EngineError::OutOfRange {
                    record,
                    feature: feature.to_string(),
                    value,
                    min: *min,
                    max: *max,
                });
            }
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{LabelEncoder, LinearEstimator, ModelArtifacts, StandardScaler};
    use crate::models::FeatureValue;
    use std::collections::HashMap;

    fn numeric_artifacts() -> ModelArtifacts {
        ModelArtifacts::new(
            Box::new(LinearEstimator::new(vec![0.1, 0.2], 0.0)),
            Box::new(StandardScaler::new(vec![30.0, 25.0], vec![10.0, 5.0])),
            vec!["Age".to_string(), "BMI".to_string()],
            HashMap::new(),
        )
        .unwrap()
    }

    fn categorical_artifacts() -> ModelArtifacts {
        let mut encoders: HashMap<String, Box<dyn crate::artifacts::CategoricalEncoder>> =
            HashMap::new();
        encoders.insert(
            "Infertility".to_string(),
            Box::new(LabelEncoder::new(vec!["0".to_string(), "1".to_string()])),
        );
        ModelArtifacts::new(
            Box::new(LinearEstimator::new(vec![0.1, 0.2], 0.0)),
            Box::new(StandardScaler::identity(2)),
            vec!["Age".to_string(), "Infertility".to_string()],
            encoders,
        )
        .unwrap()
    }

    fn record(pairs: &[(&str, FeatureValue)]) -> InputRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_projection_and_scaling() {
        let artifacts = numeric_artifacts();
        let rec = record(&[("BMI", 30.0.into()), ("Age", 40.0.into())]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        assert_eq!(out.matrix.len(), 1);
        // (40 - 30) / 10 = 1.0, (30 - 25) / 5 = 1.0, in feature order
        assert!((out.matrix[0][0] - 1.0).abs() < 1e-12);
        assert!((out.matrix[0][1] - 1.0).abs() < 1e-12);
        assert!(out.row_warnings[0].is_empty());
    }

    #[test]
    fn test_extra_keys_ignored() {
        let artifacts = numeric_artifacts();
        let rec = record(&[
            ("Age", 40.0.into()),
            ("BMI", 30.0.into()),
            ("Unrelated_Column", "whatever".into()),
        ]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        assert_eq!(out.matrix[0].len(), 2);
    }

    #[test]
    fn test_missing_feature_names_record_and_feature() {
        let artifacts = numeric_artifacts();
        let good = record(&[("Age", 40.0.into()), ("BMI", 30.0.into())]);
        let bad = record(&[("Age", 40.0.into())]);

        let err = transform_batch(&artifacts, &[good, bad]).unwrap_err();
        match err {
            EngineError::MissingFeature { record, feature } => {
                assert_eq!(record, 1);
                assert_eq!(feature, "BMI");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let artifacts = numeric_artifacts();
        let rec = record(&[("Age", "forty".into()), ("BMI", 30.0.into())]);

        let err = transform_batch(&artifacts, &[rec]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidValue { record: 0, .. }
        ));
    }

    #[test]
    fn test_numeric_string_accepted() {
        let artifacts = numeric_artifacts();
        let rec = record(&[("Age", "40".into()), ("BMI", 30.0.into())]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        assert!((out.matrix[0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let artifacts = numeric_artifacts();
        let rec = record(&[("Age", 40.0.into()), ("BMI", 200.0.into())]);

        let err = transform_batch(&artifacts, &[rec]).unwrap_err();
        match err {
            EngineError::OutOfRange { feature, value, min, max, .. } => {
                assert_eq!(feature, "BMI");
                assert_eq!(value, 200.0);
                assert_eq!((min, max), (10.0, 60.0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_known_category_encodes_without_warning() {
        let artifacts = categorical_artifacts();
        let rec = record(&[("Age", 40.0.into()), ("Infertility", 1.0.into())]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        assert!((out.matrix[0][1] - 1.0).abs() < 1e-12);
        assert!(out.row_warnings[0].is_empty());
    }

    #[test]
    fn test_unknown_category_substitutes_and_warns() {
        let artifacts = categorical_artifacts();
        let rec = record(&[("Age", 40.0.into()), ("Infertility", "unknown".into())]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        // First fitted class "0" encodes to 0.0
        assert_eq!(out.matrix[0][1], 0.0);
        assert_eq!(out.row_warnings[0].len(), 1);
        let warning = &out.row_warnings[0][0];
        assert_eq!(warning.feature, "Infertility");
        assert_eq!(warning.unknown_value, "unknown");
        assert_eq!(warning.substituted, "0");
    }

    #[test]
    fn test_key_insertion_order_irrelevant() {
        let artifacts = numeric_artifacts();
        let forward = record(&[("Age", 40.0.into()), ("BMI", 30.0.into())]);
        let reversed = record(&[("BMI", 30.0.into()), ("Age", 40.0.into())]);

        let a = transform_batch(&artifacts, &[forward]).unwrap();
        let b = transform_batch(&artifacts, &[reversed]).unwrap();
        assert_eq!(a.matrix, b.matrix);
    }

    #[test]
    fn test_output_is_debug_printable() {
        let artifacts = numeric_artifacts();
        let rec = record(&[("Age", 40.0.into()), ("BMI", 30.0.into())]);

        let out = transform_batch(&artifacts, &[rec]).unwrap();
        assert!(format!("{out:?}").contains("matrix"));
    }

    #[test]
    fn test_batch_shape() {
        let artifacts = numeric_artifacts();
        let recs: Vec<InputRecord> = (0..3)
            .map(|i| {
                record(&[
                    ("Age", (30.0 + i as f64).into()),
                    ("BMI", 25.0.into()),
                ])
            })
            .collect();

        let out = transform_batch(&artifacts, &recs).unwrap();
        assert_eq!(out.matrix.len(), 3);
        assert!(out.matrix.iter().all(|row| row.len() == 2));
    }
}
