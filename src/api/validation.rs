use thiserror::Error;

use super::models::{EnqueueJobRequest, FinishJobRequest, LeaseJobsRequest, RegisterWorkerRequest};

/// Longest accepted `node_id` / `site_id`, in bytes
pub const MAX_ID_BYTES: usize = 128;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),
    #[error("{field} exceeds 128 bytes ({len})")]
    IdentifierTooLong { field: &'static str, len: usize },
    #[error("max_jobs must be at least 1, got {0}")]
    InvalidMaxJobs(i64),
    #[error("job_id must be positive, got {0}")]
    InvalidJobId(i64),
}

fn validate_identifier(field: &'static str, value: &str) -> Result<(), RequestValidationError> {
    if value.trim().is_empty() {
        return Err(RequestValidationError::EmptyIdentifier(field));
    }
    if value.len() > MAX_ID_BYTES {
        return Err(RequestValidationError::IdentifierTooLong {
            field,
            len: value.len(),
        });
    }
    Ok(())
}

pub fn validate_register(req: &RegisterWorkerRequest) -> Result<(), RequestValidationError> {
    validate_identifier("node_id", &req.node_id)
}

pub fn validate_lease(req: &LeaseJobsRequest) -> Result<(), RequestValidationError> {
    validate_identifier("node_id", &req.node_id)?;
    if req.max_jobs < 1 {
        return Err(RequestValidationError::InvalidMaxJobs(req.max_jobs));
    }
    Ok(())
}

pub fn validate_finish(req: &FinishJobRequest) -> Result<(), RequestValidationError> {
    validate_identifier("node_id", &req.node_id)?;
    if req.job_id < 1 {
        return Err(RequestValidationError::InvalidJobId(req.job_id));
    }
    Ok(())
}

pub fn validate_enqueue(req: &EnqueueJobRequest) -> Result<(), RequestValidationError> {
    validate_identifier("site_id", &req.site_id)
}
