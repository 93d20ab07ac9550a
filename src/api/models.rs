//! Wire models of the scheduler HTTP API.
//!
//! Workers use three calls, all carrying the shared secret in `X-Mesh-Token`:
//!
//! ```json
//! POST /v1/workers/register
//! { "node_id": "w1", "capabilities": { "sites": ["siteA"] } }
//! -> { "ok": true }
//!
//! POST /v1/jobs/lease
//! { "node_id": "w1", "want_sites": ["siteA"], "max_jobs": 3 }
//! -> { "jobs": [ { "id": 1, "site_id": "siteA", "payload": { "q": "dune" } } ] }
//!
//! POST /v1/jobs/finish
//! { "job_id": 1, "node_id": "w1", "success": true, "new_cursor_value": "2024-05-01" }
//! -> { "ok": true }
//! ```
//!
//! Producers enqueue with `POST /v1/jobs` and operators read jobs, workers,
//! cursors and metrics. Errors always use [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;
use crate::store::{JobCounts, JobId, JsonMap, LeasedJob, SiteCursor, Worker};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkerRequest {
    pub node_id: String,
    #[serde(default)]
    pub capabilities: JsonMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseJobsRequest {
    pub node_id: String,
    #[serde(default)]
    pub want_sites: Option<Vec<String>>,
    pub max_jobs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseJobsResponse {
    pub jobs: Vec<LeasedJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishJobRequest {
    pub job_id: JobId,
    pub node_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_cursor_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueJobRequest {
    pub site_id: String,
    #[serde(default)]
    pub payload: JsonMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersResponse {
    pub workers: Vec<Worker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorsResponse {
    pub cursors: Vec<SiteCursor>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub counters: MetricsSnapshot,
    pub jobs: JobCounts,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
