//! HTTP API for the classroom dashboard.
//!
//! This module provides an HTTP server that:
//! - Accepts sensor readings and camera emotion counts
//! - Serves forecast summaries, alerts and readiness status
//! - Scores raw values with the rule-based scorer
//!
//! # Architecture
//!
//! ```text
//! Sensor bridge ──→ POST /api/readings ──→ PredictionService ──→ GET /api/prediction/forecast
//! Camera        ──→ POST /api/engagement ──↗                 ──→ GET /api/alerts/check
//! ```
//!
//! Insufficient data is a normal answer (`200` with `success: false`).
//! Missing models answer `503` so dashboards can show a degraded state.

use crate::collector::line::EngagementHandle;
use crate::collector::types::{EmotionCounts, Engagement, EnvironmentalValues, RawReading, Reading};
use crate::core::alerts::Alert;
use crate::core::comfort::{comfort_score, level_for_score};
use crate::error::PredictionError;
use crate::prediction::service::{ForecastSummary, PredictionService, PredictionStatus};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Shared server state
pub struct ServerState {
    /// The prediction pipeline
    service: Arc<PredictionService>,
    /// Latest engagement counts from the camera
    engagement: EngagementHandle,
}

impl ServerState {
    /// Create new server state
    pub fn new(service: Arc<PredictionService>, engagement: EngagementHandle) -> Self {
        Self {
            service,
            engagement,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models_loaded: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings_available: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings_needed: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &PredictionError) -> ApiError {
    let status = match err {
        PredictionError::IncompleteReading { .. } => StatusCode::BAD_REQUEST,
        PredictionError::InsufficientData { .. } => StatusCode::OK,
        PredictionError::ModelNotLoaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PredictionError::FeatureMismatch { .. }
        | PredictionError::ArtifactMismatch(_)
        | PredictionError::InvalidModelOutput(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let (readings_available, readings_needed) = match err {
        PredictionError::InsufficientData {
            available,
            required,
        } => (Some(*available), Some(*required)),
        _ => (None, None),
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.to_string(),
            code: err.code().to_string(),
            readings_available,
            readings_needed,
        }),
    )
}

/// Response from the reading endpoint
#[derive(Serialize)]
pub struct ReadingResponse {
    pub success: bool,
    pub reading: Reading,
    pub buffer_size: usize,
}

/// Successful forecast
#[derive(Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ForecastSummary,
}

/// Alert check result
#[derive(Serialize)]
pub struct AlertsResponse {
    pub success: bool,
    pub alerts: Vec<Alert>,
    pub timestamp: DateTime<Utc>,
}

/// Rule-based score result
#[derive(Serialize)]
pub struct ScoreResponse {
    pub success: bool,
    pub score: f64,
    pub level: String,
    pub level_code: u8,
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded: state.service.models_loaded(),
    })
}

/// POST /api/readings
///
/// Engagement fields omitted from the body are taken from the latest camera
/// counts. Before the camera has posted any, such a reading is incomplete.
async fn submit_reading(
    State(state): State<Arc<ServerState>>,
    Json(raw): Json<RawReading>,
) -> Result<Json<ReadingResponse>, ApiError> {
    let raw = match state.engagement.get() {
        Some(engagement) => raw.with_engagement_defaults(engagement),
        None => raw,
    };
    let reading = state
        .service
        .submit_reading(raw)
        .map_err(|e| api_error(&e))?;

    Ok(Json(ReadingResponse {
        success: true,
        reading,
        buffer_size: state.service.buffer().len(),
    }))
}

/// POST /api/engagement
async fn update_engagement(
    State(state): State<Arc<ServerState>>,
    Json(counts): Json<EmotionCounts>,
) -> Json<Engagement> {
    let engagement = counts.engagement();
    state.engagement.set(engagement);
    Json(engagement)
}

/// GET /api/prediction/forecast
async fn forecast(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let summary = state
        .service
        .get_forecast_summary()
        .map_err(|e| api_error(&e))?;
    Ok(Json(ForecastResponse {
        success: true,
        summary,
    }))
}

/// GET /api/prediction/status
async fn status(State(state): State<Arc<ServerState>>) -> Json<PredictionStatus> {
    Json(state.service.status())
}

/// GET /api/alerts/check
async fn check_alerts(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let alerts = state.service.check_alerts().map_err(|e| api_error(&e))?;
    Ok(Json(AlertsResponse {
        success: true,
        alerts,
        timestamp: Utc::now(),
    }))
}

/// POST /api/comfort/score
async fn score(Json(values): Json<EnvironmentalValues>) -> Json<ScoreResponse> {
    let score = comfort_score(&values);
    let level = level_for_score(score);
    Json(ScoreResponse {
        success: true,
        score,
        level: level.label().to_string(),
        level_code: level.code(),
    })
}

/// Build the API router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/readings", post(submit_reading))
        .route("/api/engagement", post(update_engagement))
        .route("/api/prediction/forecast", get(forecast))
        .route("/api/prediction/status", get(status))
        .route("/api/alerts/check", get(check_alerts))
        .route("/api/comfort/score", post(score))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    state: Arc<ServerState>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Classroom comfort API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
