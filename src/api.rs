//! REST API Server for the signal allocation engine
//!
//! Exposes the optimizer, the probability producer and the run audit log
//! over HTTP.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AllocationRecord, AuditLog};
use crate::error::PipelineError;
use crate::models::{PipelineOutcome, RawRecord};
use crate::pipeline::{render, SignalPipeline};
use crate::predictor::SignalPredictor;
use crate::validator::batch_from_value;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<SignalPipeline>,
    /// None when no model file could be loaded
    pub predictor: Option<SignalPredictor>,
    pub audit_log: Arc<AuditLog>,
}

impl ApiState {
    pub fn new(predictor: Option<SignalPredictor>) -> Self {
        Self {
            pipeline: Arc::new(SignalPipeline::default()),
            predictor,
            audit_log: Arc::new(AuditLog::new()),
        }
    }

    pub fn with_audit_log(mut self, audit_log: AuditLog) -> Self {
        self.audit_log = Arc::new(audit_log);
        self
    }
}

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Schema { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::InvalidInput(_) | PipelineError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "model_loaded": state.predictor.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Optimize Endpoint
/// =============================

async fn optimize(
    State(state): State<ApiState>,
    body: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let records = match body {
        Ok(Json(value)) => batch_from_value(value),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected optimize body");
            return (
                rejection.status(),
                Json(ApiResponse::error(rejection.body_text())),
            );
        }
    };

    let records = match records {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Rejected optimize body");
            return (status_for(&e), Json(ApiResponse::error(e.to_string())));
        }
    };

    info!(records = records.len(), "Received optimize request");

    let result = state.pipeline.run(&records);
    let record = AllocationRecord::new(&records, &result);
    let policy = record.policy;
    let run_id = state.audit_log.record(record).await;

    match &result {
        Ok(outcome) => {
            let kind = match outcome {
                PipelineOutcome::Allocated(_) => "allocation",
                PipelineOutcome::Empty(_) => "empty",
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "run_id": run_id,
                    "outcome": kind,
                    "policy": policy,
                    "result": render(&result),
                }))),
            )
        }
        Err(e) => {
            warn!(%run_id, error = %e, "Optimize request failed");
            (status_for(e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// =============================
/// Predict Endpoint
/// =============================

async fn predict(
    State(state): State<ApiState>,
    Json(features): Json<RawRecord>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(predictor) = state.predictor.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("No model loaded".into())),
        );
    };

    match predictor.predict_features(&features) {
        Ok(prediction) => (StatusCode::OK, Json(ApiResponse::success(prediction))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// =============================
/// Audit Endpoints
/// =============================

async fn get_run(
    State(state): State<ApiState>,
    Path(run_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.audit_log.get(run_id).await {
        Some(record) => (StatusCode::OK, Json(ApiResponse::success(record))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Run {} not found", run_id))),
        ),
    }
}

async fn list_runs(State(state): State<ApiState>) -> Json<ApiResponse> {
    Json(ApiResponse::success(state.audit_log.list().await))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/portfolio/optimize", post(optimize))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/runs", get(list_runs))
        .route("/api/v1/runs/:run_id", get(get_run))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
