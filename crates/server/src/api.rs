//! HTTP API: prediction endpoints, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use endo_engine::{
    Confidence, EngineError, FeatureValue, InputRecord, PredictionEngine, SoftWarning,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub metrics: endo_engine::EngineMetrics,
    pub service_name: String,
}

impl AppState {
    pub fn new(
        engine: Arc<PredictionEngine>,
        metrics: endo_engine::EngineMetrics,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            metrics,
            service_name: service_name.into(),
        }
    }
}

// ==================== Request / response schemas ====================

/// A single patient record as accepted on the wire
///
/// Field names are the client-facing snake_case forms; `to_record` maps
/// them onto the training-time column names the engine expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientData {
    /// Patient age in years (18-100)
    pub age: u32,
    /// Menstrual irregularity (0=No, 1=Yes)
    pub menstrual_irregularity: u8,
    /// Chronic pain level on scale 0-10
    pub chronic_pain_level: f64,
    /// Hormone level abnormality (0=No, 1=Yes)
    pub hormone_level_abnormality: u8,
    /// Infertility status (0=No, 1=Yes)
    pub infertility: u8,
    /// Body Mass Index (10-60)
    pub bmi: f64,
}

impl PatientData {
    /// Boundary validation mirroring the published request schema
    pub fn validate(&self) -> Result<(), String> {
        if !(18..=100).contains(&self.age) {
            return Err("age must be between 18 and 100 years".to_string());
        }
        if self.menstrual_irregularity > 1 {
            return Err("menstrual_irregularity must be 0 or 1".to_string());
        }
        if !(0.0..=10.0).contains(&self.chronic_pain_level) {
            return Err("chronic_pain_level must be between 0 and 10".to_string());
        }
        if self.hormone_level_abnormality > 1 {
            return Err("hormone_level_abnormality must be 0 or 1".to_string());
        }
        if self.infertility > 1 {
            return Err("infertility must be 0 or 1".to_string());
        }
        if !(10.0..=60.0).contains(&self.bmi) {
            return Err("bmi must be between 10 and 60".to_string());
        }
        Ok(())
    }

    /// Map onto the training-time column names
    pub fn to_record(&self) -> InputRecord {
        let mut record = InputRecord::new();
        record.insert("Age".to_string(), FeatureValue::Number(self.age as f64));
        record.insert(
            "Menstrual_Irregularity".to_string(),
            FeatureValue::Number(self.menstrual_irregularity as f64),
        );
        record.insert(
            "Chronic_Pain_Level".to_string(),
            FeatureValue::Number(self.chronic_pain_level),
        );
        record.insert(
            "Hormone_Level_Abnormality".to_string(),
            FeatureValue::Number(self.hormone_level_abnormality as f64),
        );
        record.insert(
            "Infertility".to_string(),
            FeatureValue::Number(self.infertility as f64),
        );
        record.insert("BMI".to_string(), FeatureValue::Number(self.bmi));
        record
    }
}

/// Response for a single prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SoftWarning>,
    pub input_data: PatientData,
}

/// Batch prediction request
#[derive(Debug, Deserialize)]
pub struct BatchPredictionRequest {
    pub patients: Vec<PatientData>,
}

/// One entry of a batch response; `patient_id` is the 1-based request
/// position, not a durable identifier.
#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub patient_id: usize,
    pub prediction: Option<f64>,
    pub confidence: Option<Confidence>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SoftWarning>,
}

/// Batch prediction response
#[derive(Debug, Serialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<BatchItemResponse>,
    pub total_processed: usize,
    pub success: bool,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ==================== Error mapping ====================

/// API-level error carrying the HTTP status to respond with
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = if err.is_fatal() {
            StatusCode::SERVICE_UNAVAILABLE
        } else if err.is_record_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.status.canonical_reason().unwrap_or("Error"),
            "detail": self.message,
        }));
        (self.status, body).into_response()
    }
}

// ==================== Handlers ====================

/// Root endpoint - service banner
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "message": format!("{} is running", state.service_name),
    }))
}

/// Health check - always 200, reports whether the model is loaded
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.engine.is_ready(),
        "service": state.service_name,
    }))
}

/// Readiness check - 200 when the engine can serve predictions, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.engine.is_ready() {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ready": false,
                "reason": "model artifacts not loaded",
            })),
        )
    }
}

/// Single prediction
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(patient): Json<PatientData>,
) -> Result<Json<PredictionResponse>, ApiError> {
    patient.validate().map_err(ApiError::unprocessable)?;

    let result = state.engine.predict(&patient.to_record())?;

    Ok(Json(PredictionResponse {
        prediction: round4(result.score),
        confidence: result.confidence,
        warnings: result.warnings,
        input_data: patient,
    }))
}

/// Batch prediction with per-item failure isolation
async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchPredictionRequest>,
) -> Result<Json<BatchPredictionResponse>, ApiError> {
    let records: Vec<InputRecord> = request.patients.iter().map(PatientData::to_record).collect();

    let batch = state.engine.predict_batch(&records)?;

    let predictions = batch
        .items
        .into_iter()
        .map(|item| match item.result {
            Some(result) => BatchItemResponse {
                patient_id: item.index,
                prediction: Some(round4(result.score)),
                confidence: Some(result.confidence),
                status: "success",
                error: None,
                warnings: result.warnings,
            },
            None => BatchItemResponse {
                patient_id: item.index,
                prediction: None,
                confidence: None,
                status: "error",
                error: item.error,
                warnings: Vec::new(),
            },
        })
        .collect();

    Ok(Json(BatchPredictionResponse {
        predictions,
        total_processed: batch.total_processed,
        success: batch.success,
    }))
}

/// Model introspection endpoint
async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.model_info() {
        Some(info) => Json(json!({
            "model_loaded": true,
            "model_type": info.model_type,
            "features": info.features,
            "features_count": info.features_count,
            "encoded_columns": info.encoded_columns,
            "loaded_at": info.loaded_at,
        })),
        None => Json(json!({
            "model_loaded": false,
            "model_type": null,
            "features": null,
            "features_count": 0,
        })),
    }
}

/// Explicit artifact reload; swaps the serving set only on full success
async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.reload()?;
    Ok(Json(json!({
        "status": "reloaded",
        "model_info": state.engine.model_info(),
    })))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/predict_batch", post(predict_batch))
        .route("/model-info", get(model_info))
        .route("/reload", post(reload))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_patient() -> PatientData {
        PatientData {
            age: 32,
            menstrual_irregularity: 1,
            chronic_pain_level: 6.5,
            hormone_level_abnormality: 1,
            infertility: 0,
            bmi: 23.5,
        }
    }

    #[test]
    fn test_valid_patient_passes() {
        assert!(sample_patient().validate().is_ok());
    }

    #[test]
    fn test_age_bounds_enforced() {
        let mut patient = sample_patient();
        patient.age = 17;
        assert!(patient.validate().is_err());
        patient.age = 101;
        assert!(patient.validate().is_err());
    }

    #[test]
    fn test_flag_bounds_enforced() {
        let mut patient = sample_patient();
        patient.infertility = 2;
        assert!(patient.validate().unwrap_err().contains("infertility"));
    }

    #[test]
    fn test_bmi_bounds_enforced() {
        let mut patient = sample_patient();
        patient.bmi = 200.0;
        assert!(patient.validate().unwrap_err().contains("bmi"));
    }

    #[test]
    fn test_record_uses_training_column_names() {
        let record = sample_patient().to_record();
        for column in [
            "Age",
            "Menstrual_Irregularity",
            "Chronic_Pain_Level",
            "Hormone_Level_Abnormality",
            "Infertility",
            "BMI",
        ] {
            assert!(record.contains_key(column), "missing {column}");
        }
        assert_eq!(record["Age"], FeatureValue::Number(32.0));
        assert_eq!(record["BMI"], FeatureValue::Number(23.5));
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.7705999), 0.7706);
        assert_eq!(round4(0.33335), 0.3334);
        assert_eq!(round4(1.0), 1.0);
    }
}
