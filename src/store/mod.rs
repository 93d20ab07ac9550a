//! Relational store shared by every scheduler instance
//!
//! SQLite (through `sqlx`) holds the three scheduler tables:
//!
//! - `workers`: registered execution nodes and their capabilities
//! - `jobs`: the job queue and lease bookkeeping
//! - `site_cursors`: per-site watermarks advanced by `finish`
//!
//! The store is the only synchronization point between scheduler instances.
//! Nothing here caches rows in memory; every operation is a round trip.
//!
//! ## Atomicity
//!
//! SQLite serializes writers. Each state transition callers can race on is a
//! single guarded `UPDATE` (or a transaction that opens with its write), so a
//! competing caller either waits on the busy timeout or observes the
//! committed result.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesh_scheduler::store::MeshStore;
//!
//! let store = MeshStore::connect("sqlite://data/mesh.db", 8).await?;
//! let job = store.insert_job("siteA", &payload, Utc::now()).await?;
//! ```

pub mod cursors;
pub mod error;
pub mod jobs;
pub mod models;
pub mod workers;

pub use error::{Result, StoreError};
pub use jobs::{FinishJob, FinishReceipt, JobCounts, LeaseQuery, ReapStats};
pub use models::{Job, JobId, JobStatus, JsonMap, LeasedJob, SiteCursor, Worker};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{info, instrument};

/// How long a writer waits for the database lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workers (
    node_id        TEXT PRIMARY KEY NOT NULL,
    capabilities   TEXT NOT NULL DEFAULT '{}',
    last_heartbeat INTEGER NOT NULL,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id       TEXT NOT NULL,
    payload       TEXT NOT NULL DEFAULT '{}',
    status        TEXT NOT NULL DEFAULT 'pending'
                  CHECK (status IN ('pending', 'leased', 'done', 'failed')),
    leased_by     TEXT,
    leased_at     INTEGER,
    attempts      INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL,
    CHECK ((leased_by IS NULL) = (leased_at IS NULL)),
    CHECK ((status = 'leased') = (leased_by IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_jobs_status_created ON jobs (status, created_at, id);
CREATE INDEX IF NOT EXISTS idx_jobs_site_status ON jobs (site_id, status);
CREATE INDEX IF NOT EXISTS idx_jobs_status_leased_at ON jobs (status, leased_at);

CREATE TABLE IF NOT EXISTS site_cursors (
    site_id      TEXT PRIMARY KEY NOT NULL,
    cursor_value TEXT NOT NULL,
    updated_at   INTEGER NOT NULL
);
"#;

/// Connection pool to the scheduler database. Clones share the pool.
#[derive(Debug, Clone)]
pub struct MeshStore {
    pool: SqlitePool,
}

impl MeshStore {
    /// Open (creating if needed) the database at `url` and apply the schema
    ///
    /// # Example URLs
    /// - `sqlite://data/mesh.db` - relative file, parent directory created
    /// - `sqlite:///var/lib/mesh/mesh.db` - absolute file
    /// - `sqlite::memory:` - ephemeral, see [`MeshStore::in_memory`]
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = database_file(url).as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Connection)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(StoreError::Connection)?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, max_connections, "Database ready");
        Ok(store)
    }

    /// Ephemeral database for tests and local experiments
    ///
    /// Every SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::Connection)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::Connection)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema; every statement is idempotent
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Health check - verify the database answers
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// File path behind a `sqlite:` URL, `None` for in-memory databases
fn database_file(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}
