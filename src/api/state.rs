use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::scheduler::Scheduler;
use crate::store::MeshStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: MeshStore,
    pub scheduler: Scheduler,
    pub metrics: Arc<Metrics>,
    pub shared_secret: Arc<str>,
}

impl AppState {
    pub fn new(config: Config, store: MeshStore) -> Self {
        let metrics = Arc::new(Metrics::new());
        let scheduler = Scheduler::new(store.clone(), &config, metrics.clone());
        let shared_secret: Arc<str> = config.auth.shared_secret.as_deref().unwrap_or_default().into();

        Self {
            config: Arc::new(config),
            store,
            scheduler,
            metrics,
            shared_secret,
        }
    }
}
