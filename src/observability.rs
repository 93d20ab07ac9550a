//! Metrics counters and tracing setup

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Process-local counters. Never consulted for scheduling decisions.
#[derive(Debug, Default)]
pub struct Metrics {
    workers_registered: AtomicU64,
    jobs_enqueued: AtomicU64,
    jobs_leased: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    leases_reclaimed: AtomicU64,
    leases_exhausted: AtomicU64,
    finish_conflicts: AtomicU64,
    auth_rejected: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worker_registered(&self) {
        self.workers_registered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "workers_registered", "Metric incremented");
    }

    pub fn job_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_enqueued", "Metric incremented");
    }

    pub fn jobs_leased(&self, count: usize) {
        self.jobs_leased.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_leased", count, "Metric incremented");
    }

    pub fn job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_completed", "Metric incremented");
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_failed", "Metric incremented");
    }

    pub fn leases_reaped(&self, requeued: u64, exhausted: u64) {
        self.leases_reclaimed.fetch_add(requeued, Ordering::Relaxed);
        self.leases_exhausted.fetch_add(exhausted, Ordering::Relaxed);
        tracing::debug!(
            counter = "leases_reclaimed",
            requeued,
            exhausted,
            "Metric incremented"
        );
    }

    pub fn finish_conflict(&self) {
        self.finish_conflicts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "finish_conflicts", "Metric incremented");
    }

    pub fn auth_rejected(&self) {
        self.auth_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "auth_rejected", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            workers_registered: self.workers_registered.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_leased: self.jobs_leased.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            leases_reclaimed: self.leases_reclaimed.load(Ordering::Relaxed),
            leases_exhausted: self.leases_exhausted.load(Ordering::Relaxed),
            finish_conflicts: self.finish_conflicts.load(Ordering::Relaxed),
            auth_rejected: self.auth_rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub workers_registered: u64,
    pub jobs_enqueued: u64,
    pub jobs_leased: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub leases_reclaimed: u64,
    pub leases_exhausted: u64,
    pub finish_conflicts: u64,
    pub auth_rejected: u64,
}
