//! Scheduler services over the shared store
//!
//! Each service is a cheap clone of the [`MeshStore`] handle plus the policy
//! it enforces. None of them keeps rows in memory, so any number of
//! scheduler instances can serve the same database.

mod cursors;
mod lease;
mod reaper;
mod registry;

pub use cursors::SiteCursorStore;
pub use lease::{FinishRequest, JobLeaseManager};
pub use reaper::LeaseReaper;
pub use registry::WorkerRegistry;

use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::store::MeshStore;

/// All scheduler services sharing one store and one metrics handle
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub workers: WorkerRegistry,
    pub jobs: JobLeaseManager,
    pub cursors: SiteCursorStore,
    pub reaper: LeaseReaper,
}

impl Scheduler {
    pub fn new(store: MeshStore, config: &Config, metrics: Arc<Metrics>) -> Self {
        Self {
            workers: WorkerRegistry::new(store.clone(), metrics.clone()),
            jobs: JobLeaseManager::new(store.clone(), config.scheduler.clone(), metrics.clone()),
            cursors: SiteCursorStore::new(store.clone()),
            reaper: LeaseReaper::new(store, &config.scheduler, metrics),
        }
    }
}
