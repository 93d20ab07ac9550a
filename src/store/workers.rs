//! Worker registry table

use chrono::{DateTime, Utc};
use sqlx::Sqlite;

use super::MeshStore;
use super::error::Result;
use super::models::{JsonMap, Worker, WorkerRow, to_millis};

/// Insert a worker or refresh an existing one in a single statement
///
/// Re-registration overwrites `capabilities`, re-activates the worker and
/// refreshes `last_heartbeat`; `created_at` keeps its first value.
pub async fn upsert_worker<'c, E>(
    exe: E,
    node_id: &str,
    capabilities: &str,
    now_ms: i64,
) -> std::result::Result<(), sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let query = r#"
        INSERT INTO workers (node_id, capabilities, last_heartbeat, is_active, created_at)
        VALUES (?1, ?2, ?3, 1, ?3)
        ON CONFLICT (node_id) DO UPDATE SET
            capabilities = excluded.capabilities,
            last_heartbeat = excluded.last_heartbeat,
            is_active = 1
    "#;
    sqlx::query(query)
        .bind(node_id)
        .bind(capabilities)
        .bind(now_ms)
        .execute(exe)
        .await?;
    Ok(())
}

impl MeshStore {
    pub async fn register_worker(
        &self,
        node_id: &str,
        capabilities: &JsonMap,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let capabilities = serde_json::to_string(capabilities)?;
        upsert_worker(self.pool(), node_id, &capabilities, to_millis(now)).await?;
        Ok(())
    }

    pub async fn get_worker(&self, node_id: &str) -> Result<Option<Worker>> {
        let query = r#"
            SELECT node_id, capabilities, last_heartbeat, is_active, created_at
            FROM workers
            WHERE node_id = ?1
        "#;
        let row: Option<WorkerRow> = sqlx::query_as(query)
            .bind(node_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Worker::try_from).transpose()
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>> {
        let query = r#"
            SELECT node_id, capabilities, last_heartbeat, is_active, created_at
            FROM workers
            ORDER BY node_id ASC
        "#;
        let rows: Vec<WorkerRow> = sqlx::query_as(query).fetch_all(self.pool()).await?;
        rows.into_iter().map(Worker::try_from).collect()
    }
}
