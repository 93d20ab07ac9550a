use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::observability::Metrics;
use crate::store::{MeshStore, ReapStats, Result};

/// Returns expired leases to the queue
///
/// A lease is expired once `leased_at + lease_duration` has passed. The job
/// goes back to `pending` and can be leased again right away, unless it has
/// already been leased `max_attempts` times, in which case it is failed.
#[derive(Debug, Clone)]
pub struct LeaseReaper {
    store: MeshStore,
    lease_duration: Duration,
    max_attempts: u32,
    metrics: Arc<Metrics>,
}

impl LeaseReaper {
    pub fn new(store: MeshStore, policy: &SchedulerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            lease_duration: policy.lease_duration.as_duration(),
            max_attempts: policy.max_attempts,
            metrics,
        }
    }

    /// One sweep over every expired lease
    pub async fn sweep_once(&self) -> Result<ReapStats> {
        let lease_duration =
            chrono::Duration::from_std(self.lease_duration).unwrap_or(chrono::Duration::MAX);

        let stats = self
            .store
            .reclaim_expired_leases(lease_duration, self.max_attempts, Utc::now())
            .await?;

        if stats.total() > 0 {
            self.metrics.leases_reaped(stats.requeued, stats.failed);
            info!(
                requeued = stats.requeued,
                failed = stats.failed,
                "Expired leases reclaimed"
            );
        } else {
            debug!("No expired leases");
        }
        Ok(stats)
    }

    /// Sweep every `interval` until `shutdown` flips to `true` or its sender is dropped
    pub fn spawn(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "Lease reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            if err.is_transient() {
                                warn!(error = %err, "Lease sweep failed, retrying next tick");
                            } else {
                                error!(error = %err, "Lease sweep failed");
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Lease reaper stopped");
        })
    }
}
