use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::observability::Metrics;
use crate::store::{
    FinishJob, FinishReceipt, Job, JobCounts, JobId, JobStatus, JsonMap, LeaseQuery, LeasedJob,
    MeshStore, Result, StoreError,
};

/// A worker's report on one leased job
#[derive(Debug, Clone, Copy)]
pub struct FinishRequest<'a> {
    pub job_id: JobId,
    pub node_id: &'a str,
    pub success: bool,
    pub error_message: Option<&'a str>,
    pub new_cursor_value: Option<&'a str>,
}

/// Job lifecycle: enqueue, lease, finish
#[derive(Debug, Clone)]
pub struct JobLeaseManager {
    store: MeshStore,
    policy: SchedulerConfig,
    metrics: Arc<Metrics>,
}

impl JobLeaseManager {
    pub fn new(store: MeshStore, policy: SchedulerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            policy,
            metrics,
        }
    }

    #[instrument(skip(self, payload), err)]
    pub async fn enqueue(&self, site_id: &str, payload: &JsonMap) -> Result<Job> {
        let job = self.store.insert_job(site_id, payload, Utc::now()).await?;
        self.metrics.job_enqueued();
        info!(job_id = job.id, site_id, "Job enqueued");
        Ok(job)
    }

    /// Lease up to `max_jobs` pending jobs for `node_id`
    ///
    /// `max_jobs` is clamped to the configured per-call cap. An empty result
    /// means nothing is eligible right now.
    #[instrument(skip(self, want_sites), err)]
    pub async fn lease(
        &self,
        node_id: &str,
        want_sites: Option<&[String]>,
        max_jobs: u32,
    ) -> Result<Vec<LeasedJob>> {
        let limit = max_jobs.min(self.policy.max_jobs_per_lease);
        let query = LeaseQuery {
            node_id,
            want_sites,
            limit,
            max_workers_per_site: self.policy.max_workers_per_site,
        };

        let jobs = self.store.lease_jobs(&query, Utc::now()).await?;

        if jobs.is_empty() {
            debug!(node_id, limit, "No eligible jobs");
        } else {
            self.metrics.jobs_leased(jobs.len());
            info!(node_id, count = jobs.len(), requested = max_jobs, "Jobs leased");
        }
        Ok(jobs)
    }

    /// Record a job outcome and advance its site cursor
    #[instrument(
        skip(self, req),
        fields(job_id = req.job_id, node_id = req.node_id, success = req.success),
        err
    )]
    pub async fn finish(&self, req: FinishRequest<'_>) -> Result<FinishReceipt> {
        let finish = FinishJob {
            job_id: req.job_id,
            node_id: req.node_id,
            success: req.success,
            error_message: req.error_message,
            new_cursor_value: req.new_cursor_value,
            reject_foreign: self.policy.reject_foreign_finish,
        };

        let receipt = match self.store.finish_job(&finish, Utc::now()).await {
            Ok(receipt) => receipt,
            Err(err @ (StoreError::LeaseConflict { .. } | StoreError::OutcomeConflict { .. })) => {
                self.metrics.finish_conflict();
                warn!(error = %err, "Finish rejected");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if let Some(owner) = &receipt.foreign_owner {
            warn!(
                job_id = receipt.job_id,
                owner = %owner,
                reporter = req.node_id,
                "Finish accepted from a worker that does not hold the lease"
            );
        }

        if receipt.replayed {
            debug!(job_id = receipt.job_id, status = %receipt.status, "Finish replayed");
        } else {
            match receipt.status {
                JobStatus::Done => self.metrics.job_completed(),
                _ => self.metrics.job_failed(),
            }
            info!(
                job_id = receipt.job_id,
                site_id = %receipt.site_id,
                status = %receipt.status,
                cursor_updated = receipt.cursor_updated,
                "Job finished"
            );
        }

        Ok(receipt)
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>> {
        self.store.get_job(job_id).await
    }

    pub async fn counts(&self) -> Result<JobCounts> {
        self.store.job_counts().await
    }
}
