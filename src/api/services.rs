use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::warn;

use super::{
    error::ApiError,
    models::{
        CursorsResponse, EnqueueJobRequest, FinishJobRequest, HealthResponse, LeaseJobsRequest,
        LeaseJobsResponse, MetricsResponse, OkResponse, RegisterWorkerRequest, WorkersResponse,
    },
    state::AppState,
    utils::{read_json, validate_body_size},
    validation,
};
use crate::scheduler::FinishRequest;
use crate::store::JobId;

fn request_limit(state: &AppState) -> usize {
    state.config.server.max_request_bytes.as_usize()
}

/// Worker registration (POST /v1/workers/register)
///
/// Creates the worker on first contact and refreshes capabilities and
/// heartbeat on every later call.
pub async fn register_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let req: RegisterWorkerRequest = read_json(&headers, body, request_limit(&state)).await?;
    validation::validate_register(&req)?;

    state
        .scheduler
        .workers
        .register(&req.node_id, &req.capabilities)
        .await?;

    Ok(Json(OkResponse::ok()))
}

/// GET /v1/workers
pub async fn list_workers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let workers = state.scheduler.workers.list().await?;
    Ok(Json(WorkersResponse { workers }))
}

/// Batch lease (POST /v1/jobs/lease)
///
/// Returns up to `max_jobs` jobs now owned by the caller. An empty list is a
/// normal answer when nothing is eligible.
pub async fn lease_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let req: LeaseJobsRequest = read_json(&headers, body, request_limit(&state)).await?;
    validation::validate_lease(&req)?;

    let max_jobs = u32::try_from(req.max_jobs).unwrap_or(u32::MAX);
    let jobs = state
        .scheduler
        .jobs
        .lease(&req.node_id, req.want_sites.as_deref(), max_jobs)
        .await?;

    Ok(Json(LeaseJobsResponse { jobs }))
}

/// Report a job outcome (POST /v1/jobs/finish)
///
/// Repeating a finish with the same outcome succeeds without further effect.
pub async fn finish_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let req: FinishJobRequest = read_json(&headers, body, request_limit(&state)).await?;
    validation::validate_finish(&req)?;

    state
        .scheduler
        .jobs
        .finish(FinishRequest {
            job_id: req.job_id,
            node_id: &req.node_id,
            success: req.success,
            error_message: req.error_message.as_deref(),
            new_cursor_value: req.new_cursor_value.as_deref(),
        })
        .await?;

    Ok(Json(OkResponse::ok()))
}

/// Producer entry point (POST /v1/jobs)
pub async fn enqueue_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let req: EnqueueJobRequest = read_json(&headers, body, request_limit(&state)).await?;
    validation::validate_enqueue(&req)?;

    let encoded = serde_json::to_vec(&req.payload)?;
    validate_body_size(
        &encoded,
        state.config.scheduler.max_payload_bytes.as_usize(),
    )?;

    let job = state
        .scheduler
        .jobs
        .enqueue(&req.site_id, &req.payload)
        .await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /v1/jobs/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .scheduler
        .jobs
        .get(job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;

    Ok(Json(job))
}

/// GET /v1/cursors
pub async fn list_cursors(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let cursors = state.scheduler.cursors.list().await?;
    Ok(Json(CursorsResponse { cursors }))
}

/// GET /v1/cursors/{site_id}
pub async fn get_cursor(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = state
        .scheduler
        .cursors
        .get(&site_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("cursor for site {site_id}")))?;

    Ok(Json(cursor))
}

/// GET /operators/metrics
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let jobs = state.scheduler.jobs.counts().await?;
    Ok(Json(MetricsResponse {
        counters: state.metrics.snapshot(),
        jobs,
    }))
}

/// Health check endpoint (GET /health)
///
/// Pings the database. Returns 503 Service Unavailable when it does not answer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let database = match state.store.ping().await {
        Ok(()) => "healthy".to_string(),
        Err(err) => {
            warn!(error = %err, "Database health check failed");
            "unhealthy".to_string()
        }
    };
    components.insert("database".to_string(), database);

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
