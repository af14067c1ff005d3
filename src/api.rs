//! REST API Server for the Stock Research Orchestrator
//!
//! Exposes the job registry and runner via HTTP endpoints
//! Start a job, poll its status, fetch results, cancel it

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::ResearchError;
use crate::facts::FactsProvider;
use crate::models::JobStatus;
use crate::runner::JobRunner;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StartRequest {
    pub company_name: Option<String>,
    pub rank: Option<u32>,
}

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
    pub runner: JobRunner,
    pub facts: Arc<dyn FactsProvider>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Start Endpoint
/// =============================

async fn start_research(
    State(state): State<ApiState>,
    Json(req): Json<StartRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let name = req.company_name.as_deref().unwrap_or("").trim();
    if name.is_empty() && req.rank.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Either company_name or rank is required".into(),
            )),
        );
    }

    info!(company = %name, rank = ?req.rank, "Received research request");

    let subject = match state.facts.resolve(name, req.rank).await {
        Ok(subject) => subject,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid subject: {}", e))),
            )
        }
    };

    let job_id = state.runner.registry().create(subject.clone()).await;

    if let Err(e) = state.runner.spawn(job_id).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to start job: {}", e))),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "job_id": job_id,
            "status": JobStatus::Created,
            "company_name": subject.name,
        }))),
    )
}

/// =============================
/// Status Endpoint
/// =============================

async fn research_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.runner.registry().get(id).await {
        Ok(job) => (StatusCode::OK, Json(ApiResponse::success(job))),
        Err(e @ ResearchError::JobNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(e.to_string())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// =============================
/// Results Endpoint
/// =============================

async fn research_results(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    let job = match state.runner.registry().get(id).await {
        Ok(job) => job,
        Err(e @ ResearchError::JobNotFound(_)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(e.to_string())),
            )
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    };

    match job.status {
        JobStatus::Completed => {
            let result = job.result.clone();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "job_id": job.id,
                    "company_name": job.subject.name,
                    "result": result,
                }))),
            )
        }
        JobStatus::Error => {
            let message = job
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".into());
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::error(format!("Job failed: {}", message))),
            )
        }
        JobStatus::Cancelled => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Job was cancelled".into())),
        ),
        JobStatus::Created | JobStatus::Running => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(format!(
                "Job not ready: {} ({}/{})",
                job.progress.message, job.progress.step, job.progress.total
            ))),
        ),
    }
}

/// =============================
/// Cancel Endpoint
/// =============================

async fn cancel_research(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.runner.registry().request_cancel(id).await {
        Ok(()) => {
            info!(job_id = %id, "Cancellation requested");
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "job_id": id,
                    "cancellation_requested": true,
                }))),
            )
        }
        Err(e @ ResearchError::JobNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(e.to_string())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(runner: JobRunner, facts: Arc<dyn FactsProvider>) -> Router {
    let state = ApiState { runner, facts };

    Router::new()
        .route("/health", get(health))
        .route("/research/start", post(start_research))
        .route("/research/status/:id", get(research_status))
        .route("/research/results/:id", get(research_results))
        .route("/research/cancel/:id", post(cancel_research))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    runner: JobRunner,
    facts: Arc<dyn FactsProvider>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(runner, facts);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
