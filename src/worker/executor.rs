//! Job execution seam
//!
//! The scheduler treats payloads as opaque; what a job does is decided by
//! the worker's [`JobExecutor`].

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::store::LeasedJob;

/// Longest error message sent back to the scheduler, in bytes
const MAX_ERROR_BYTES: usize = 2048;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to job process: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// What the worker reports to `finish`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    pub error_message: Option<String>,
    pub new_cursor_value: Option<String>,
}

impl JobOutcome {
    pub fn succeeded(new_cursor_value: Option<String>) -> Self {
        Self {
            success: true,
            error_message: None,
            new_cursor_value,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            new_cursor_value: None,
        }
    }
}

/// Runs one leased job to completion
///
/// An `Err` is reported as a failed job carrying the error text.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &LeasedJob) -> Result<JobOutcome, ExecutorError>;
}

/// Runs an external program per job
///
/// The job (`{"id", "site_id", "payload"}`) is written to stdin as JSON.
/// Exit status 0 is success and the last non-empty stdout line, if any, becomes
/// the new site cursor. On failure the tail of stderr is the error message.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl JobExecutor for CommandExecutor {
    async fn execute(&self, job: &LeasedJob) -> Result<JobOutcome, ExecutorError> {
        let input = serde_json::to_vec(job)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("MESH_JOB_ID", job.id.to_string())
            .env("MESH_SITE_ID", &job.site_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Feed stdin while stdout and stderr drain
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A program that ignores its input may close stdin early
                if let Err(err) = stdin.write_all(&input).await {
                    if err.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(err);
                    }
                }
            }
            Ok(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        debug!(job_id = job.id, status = %output.status, "Job process exited");

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(JobOutcome::succeeded(last_line(&stdout).map(str::to_owned)))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = tail_bytes(stderr.trim(), MAX_ERROR_BYTES);
            let message = if tail.is_empty() {
                format!("process exited with {}", output.status)
            } else {
                tail.to_string()
            };
            Ok(JobOutcome::failed(message))
        }
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

/// The last `max` bytes of `text`, cut on a char boundary
fn tail_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
