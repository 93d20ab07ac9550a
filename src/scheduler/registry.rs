use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::observability::Metrics;
use crate::store::{JsonMap, MeshStore, Result, Worker};

/// Worker identity and liveness
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    store: MeshStore,
    metrics: Arc<Metrics>,
}

impl WorkerRegistry {
    pub fn new(store: MeshStore, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Create or refresh a worker. Calling it again with the same `node_id`
    /// overwrites the capabilities and refreshes the heartbeat.
    #[instrument(skip(self, capabilities), err)]
    pub async fn register(&self, node_id: &str, capabilities: &JsonMap) -> Result<()> {
        self.store
            .register_worker(node_id, capabilities, Utc::now())
            .await?;
        self.metrics.worker_registered();
        info!(node_id, capabilities = capabilities.len(), "Worker registered");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Worker>> {
        self.store.list_workers().await
    }
}
