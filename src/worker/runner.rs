//! Pull loop: register, then lease → execute → finish until shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::client::{ClientError, MeshClient};
use super::executor::{JobExecutor, JobOutcome};
use crate::api::models::FinishJobRequest;
use crate::store::{JsonMap, LeasedJob};

/// Counts from one lease round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub leased: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs whose outcome could not be reported
    pub unreported: usize,
}

#[derive(bon::Builder)]
pub struct WorkerRunner {
    client: MeshClient,
    executor: Arc<dyn JobExecutor>,
    #[builder(into)]
    node_id: String,
    #[builder(default)]
    capabilities: JsonMap,
    want_sites: Option<Vec<String>>,
    #[builder(default = 10)]
    max_jobs: u32,
    #[builder(default = Duration::from_secs(5))]
    poll_interval: Duration,
}

impl WorkerRunner {
    pub async fn register(&self) -> Result<(), ClientError> {
        self.client
            .register(&self.node_id, &self.capabilities)
            .await?;
        info!(node_id = %self.node_id, "Registered with scheduler");
        Ok(())
    }

    /// Lease one batch and run it; jobs of a batch execute concurrently
    pub async fn run_once(&self) -> Result<RoundStats, ClientError> {
        let jobs = self
            .client
            .lease(&self.node_id, self.want_sites.as_deref(), self.max_jobs)
            .await?;

        let mut stats = RoundStats {
            leased: jobs.len(),
            ..RoundStats::default()
        };
        if jobs.is_empty() {
            return Ok(stats);
        }
        debug!(node_id = %self.node_id, count = jobs.len(), "Leased batch");

        let mut tasks = JoinSet::new();
        for job in jobs {
            let client = self.client.clone();
            let executor = self.executor.clone();
            let node_id = self.node_id.clone();
            tasks.spawn(async move { process_job(&client, executor.as_ref(), &node_id, job).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => stats.succeeded += 1,
                Ok(Ok(false)) => stats.failed += 1,
                Ok(Err(err)) => {
                    stats.unreported += 1;
                    warn!(error = %err, "Could not report job outcome");
                }
                Err(err) => {
                    stats.unreported += 1;
                    error!(error = %err, "Job task panicked");
                }
            }
        }

        info!(
            node_id = %self.node_id,
            leased = stats.leased,
            succeeded = stats.succeeded,
            failed = stats.failed,
            unreported = stats.unreported,
            "Batch complete"
        );
        Ok(stats)
    }

    /// Register, then keep leasing until `shutdown` flips to `true`
    ///
    /// Sleeps `poll_interval` after an empty batch or a failed lease. An
    /// in-flight batch is always finished before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ClientError> {
        self.register().await?;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.run_once().await {
                Ok(stats) => stats.leased == 0,
                Err(err) => {
                    warn!(node_id = %self.node_id, error = %err, "Lease round failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(node_id = %self.node_id, "Worker stopped");
        Ok(())
    }
}

/// Execute one job and report it. `Ok(success)` once the report is accepted.
async fn process_job(
    client: &MeshClient,
    executor: &dyn JobExecutor,
    node_id: &str,
    job: LeasedJob,
) -> Result<bool, ClientError> {
    let outcome = match executor.execute(&job).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(job_id = job.id, site_id = %job.site_id, error = %err, "Executor error");
            JobOutcome::failed(err.to_string())
        }
    };

    let request = FinishJobRequest {
        job_id: job.id,
        node_id: node_id.to_string(),
        success: outcome.success,
        error_message: outcome.error_message,
        new_cursor_value: outcome.new_cursor_value,
    };
    client.finish(&request).await?;

    debug!(job_id = job.id, success = request.success, "Job reported");
    Ok(request.success)
}
