use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Upper bound on any JSON request body
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: ByteSize,
    /// In-flight request cap across the whole router
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_request_bytes: default_max_request_bytes(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_request_bytes() -> ByteSize {
    ByteSize(1024 * 1024) // 1 MB
}

fn default_max_concurrent_requests() -> usize {
    512
}

/// Relational store connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://data/mesh.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

/// Shared-secret authentication
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Pre-shared token expected in `X-Mesh-Token`. Usually supplied via
    /// `MESH_SHARED_SECRET` rather than the TOML file.
    #[serde(default, skip_serializing)]
    pub shared_secret: Option<String>,
}

/// Lease policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// How long a lease stays valid without a finish before the reaper reclaims it
    #[serde(default = "default_lease_duration")]
    pub lease_duration: HumanDuration,
    /// Server-side cap on `max_jobs` of a single lease call
    #[serde(default = "default_max_jobs_per_lease")]
    pub max_jobs_per_lease: u32,
    /// Distinct workers allowed to hold leases on one site at once (0 = unlimited)
    #[serde(default)]
    pub max_workers_per_site: u32,
    /// Leases a job may consume before the reaper fails it (0 = unlimited)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Reject `finish` from a worker that does not hold the job's lease
    #[serde(default = "default_reject_foreign_finish")]
    pub reject_foreign_finish: bool,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lease_duration: default_lease_duration(),
            max_jobs_per_lease: default_max_jobs_per_lease(),
            max_workers_per_site: 0,
            max_attempts: default_max_attempts(),
            reject_foreign_finish: default_reject_foreign_finish(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_lease_duration() -> HumanDuration {
    HumanDuration::from_secs(10 * 60)
}

fn default_max_jobs_per_lease() -> u32 {
    100
}

fn default_max_attempts() -> u32 {
    5
}

fn default_reject_foreign_finish() -> bool {
    true
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(256 * 1024) // 256 KB
}

/// Expired lease sweeper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaperConfig {
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,
    #[serde(default = "default_reaper_interval")]
    pub interval: HumanDuration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            interval: default_reaper_interval(),
        }
    }
}

fn default_reaper_enabled() -> bool {
    true
}

fn default_reaper_interval() -> HumanDuration {
    HumanDuration::from_secs(30)
}
