use thiserror::Error;

use super::models::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Error connecting to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {job_id} is leased by '{owner}', not '{node_id}'")]
    LeaseConflict {
        job_id: JobId,
        owner: String,
        node_id: String,
    },

    #[error("Job {job_id} already finished as '{current}'")]
    OutcomeConflict { job_id: JobId, current: JobStatus },

    #[error("Invalid job status in store: {0}")]
    InvalidStatus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// `true` for failures a caller can fix by retrying later
    /// (pool exhaustion, lock contention, dropped connections).
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connection(_) => true,
            StoreError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
