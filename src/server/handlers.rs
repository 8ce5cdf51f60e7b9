//! Route handlers and error mapping.

use crate::analysis::{AnalysisError, StatisticsResult};
use crate::entropy::SourceInfo;
use crate::generation::{GenerationError, GenerationResult};
use crate::service::{HealthStatus, RandomTrust, ServiceError};
use crate::verification::{VerificationError, VerificationResult};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinError;
use tower_http::cors::CorsLayer;

type AppState = Arc<RandomTrust>;

const DEFAULT_MAX_VALUE: i64 = 1000;
const DEFAULT_STREAM_COUNT: usize = 1000;

/// Builds the API router over a shared service.
pub fn router(service: Arc<RandomTrust>) -> Router {
    Router::new()
        .route("/", get(banner_handler))
        .route("/health", get(health_handler))
        .route("/generate", get(generate_handler))
        .route("/generate-stream", get(stream_handler))
        .route("/statistics", post(statistics_handler))
        .route("/verify", post(verify_handler))
        .route("/entropy-sources", get(sources_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Error rendered as a JSON response.
#[derive(Debug)]
pub enum ApiError {
    /// Rejected by the service.
    Service(ServiceError),
    /// Blocking worker panicked or was cancelled.
    Task(JoinError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl ApiError {
    /// Returns the HTTP status and machine-readable kind for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        let service_error = match self {
            ApiError::Service(e) => e,
            ApiError::Task(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        match service_error {
            ServiceError::Generation(e) => match e {
                GenerationError::InvalidRange { .. } => (StatusCode::BAD_REQUEST, "invalid_range"),
                GenerationError::StreamTooLarge { .. } => {
                    (StatusCode::BAD_REQUEST, "stream_too_large")
                }
                GenerationError::InsufficientEntropy { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "insufficient_entropy")
                }
            },
            ServiceError::Analysis(e) => match e {
                AnalysisError::InsufficientSamples { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_samples")
                }
                AnalysisError::InvalidRange { .. } => (StatusCode::BAD_REQUEST, "invalid_range"),
                AnalysisError::ValueOutOfRange { .. } => {
                    (StatusCode::BAD_REQUEST, "value_out_of_range")
                }
                AnalysisError::Distribution(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "distribution")
                }
            },
            ServiceError::Verification(VerificationError::MalformedLedger(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "malformed_ledger")
            }
            ServiceError::Config(_) | ServiceError::Metrics(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        Self::Task(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.classify();
        let detail = match &self {
            ApiError::Service(e) => e.to_string(),
            ApiError::Task(e) => e.to_string(),
        };
        let body = ErrorBody { error, detail };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateParams {
    #[serde(default = "default_max_value")]
    max_value: i64,
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    #[serde(default = "default_stream_count")]
    count: usize,
    #[serde(default = "default_max_value")]
    max_value: i64,
}

#[derive(Debug, Deserialize)]
struct StatisticsParams {
    max_value: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SourceCatalogue {
    sources: Vec<SourceInfo>,
}

fn default_max_value() -> i64 {
    DEFAULT_MAX_VALUE
}

fn default_stream_count() -> usize {
    DEFAULT_STREAM_COUNT
}

async fn banner_handler() -> Json<Banner> {
    Json(Banner {
        message: "RandomTrust API",
        version: crate::VERSION,
    })
}

async fn health_handler(State(service): State<AppState>) -> Json<HealthStatus> {
    Json(service.health())
}

// Collection and stream hashing run on the blocking pool.
async fn generate_handler(
    State(service): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerationResult>, ApiError> {
    let result =
        tokio::task::spawn_blocking(move || service.generate(params.max_value)).await??;
    Ok(Json(result))
}

async fn stream_handler(
    State(service): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Json<Vec<u64>>, ApiError> {
    let numbers = tokio::task::spawn_blocking(move || {
        service.generate_stream(params.count, params.max_value)
    })
    .await??;
    Ok(Json(numbers))
}

async fn statistics_handler(
    State(service): State<AppState>,
    Query(params): Query<StatisticsParams>,
    Json(numbers): Json<Vec<i64>>,
) -> Result<Json<StatisticsResult>, ApiError> {
    let result = match params.max_value {
        Some(max_value) => service.analyze_in_range(&numbers, max_value)?,
        None => service.analyze(&numbers)?,
    };
    Ok(Json(result))
}

async fn verify_handler(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<VerificationResult>, ApiError> {
    Ok(Json(service.verify_json(&body)?))
}

async fn sources_handler(State(service): State<AppState>) -> Json<SourceCatalogue> {
    Json(SourceCatalogue {
        sources: service.sources(),
    })
}

async fn metrics_handler(State(service): State<AppState>) -> impl IntoResponse {
    match service.metrics().encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}
