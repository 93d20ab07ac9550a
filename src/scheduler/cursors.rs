use crate::store::{MeshStore, Result, SiteCursor};

/// Read side of the per-site watermarks. Writes happen only through
/// [`JobLeaseManager::finish`](super::JobLeaseManager::finish).
#[derive(Debug, Clone)]
pub struct SiteCursorStore {
    store: MeshStore,
}

impl SiteCursorStore {
    pub fn new(store: MeshStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, site_id: &str) -> Result<Option<SiteCursor>> {
        self.store.get_cursor(site_id).await
    }

    pub async fn list(&self) -> Result<Vec<SiteCursor>> {
        self.store.list_cursors().await
    }
}
