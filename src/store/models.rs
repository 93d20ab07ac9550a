//! Rows of the three scheduler tables and their public shapes.
//!
//! Timestamps are stored as unix milliseconds (`INTEGER`) so lease expiry
//! comparisons happen on plain integers; the public structs expose
//! `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::StoreError;

/// Server-assigned job identifier
pub type JobId = i64;

/// Opaque JSON object (worker capabilities, job payloads)
pub type JsonMap = Map<String, Value>;

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Job lifecycle state
///
/// `pending → leased → done | failed`. The reaper may also move an expired
/// lease back to `pending` or, once attempts are exhausted, to `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Leased,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Leased => "leased",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Terminal state reported by a `finish` call
    pub fn from_outcome(success: bool) -> Self {
        if success {
            JobStatus::Done
        } else {
            JobStatus::Failed
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "leased" => Ok(JobStatus::Leased),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A registered execution node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub node_id: String,
    pub capabilities: JsonMap,
    pub last_heartbeat: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct WorkerRow {
    pub node_id: String,
    pub capabilities: String,
    pub last_heartbeat: i64,
    pub is_active: bool,
    pub created_at: i64,
}

impl TryFrom<WorkerRow> for Worker {
    type Error = StoreError;

    fn try_from(row: WorkerRow) -> Result<Self, Self::Error> {
        Ok(Worker {
            node_id: row.node_id,
            capabilities: serde_json::from_str(&row.capabilities)?,
            last_heartbeat: from_millis(row.last_heartbeat),
            is_active: row.is_active,
            created_at: from_millis(row.created_at),
        })
    }
}

/// A unit of work scoped to one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub site_id: String,
    pub payload: JsonMap,
    pub status: JobStatus,
    pub leased_by: Option<String>,
    pub leased_at: Option<DateTime<Utc>>,
    /// Number of times the job has been leased
    pub attempts: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: i64,
    pub site_id: String,
    pub payload: String,
    pub status: String,
    pub leased_by: Option<String>,
    pub leased_at: Option<i64>,
    pub attempts: i64,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            site_id: row.site_id,
            payload: serde_json::from_str(&row.payload)?,
            status: row.status.parse()?,
            leased_by: row.leased_by,
            leased_at: row.leased_at.map(from_millis),
            attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
            error_message: row.error_message,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        })
    }
}

/// The worker-facing view of a freshly leased job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeasedJob {
    pub id: JobId,
    pub site_id: String,
    pub payload: JsonMap,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LeasedJobRow {
    pub id: i64,
    pub site_id: String,
    pub payload: String,
}

impl TryFrom<LeasedJobRow> for LeasedJob {
    type Error = StoreError;

    fn try_from(row: LeasedJobRow) -> Result<Self, Self::Error> {
        Ok(LeasedJob {
            id: row.id,
            site_id: row.site_id,
            payload: serde_json::from_str(&row.payload)?,
        })
    }
}

/// Last processed watermark of one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCursor {
    pub site_id: String,
    pub cursor_value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SiteCursorRow {
    pub site_id: String,
    pub cursor_value: String,
    pub updated_at: i64,
}

impl From<SiteCursorRow> for SiteCursor {
    fn from(row: SiteCursorRow) -> Self {
        SiteCursor {
            site_id: row.site_id,
            cursor_value: row.cursor_value,
            updated_at: from_millis(row.updated_at),
        }
    }
}
