//! Configuration management for the mesh scheduler
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use mesh_scheduler::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MESH__<section>__<key>`
//!
//! Examples:
//! - `MESH__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `MESH__DATABASE__URL=sqlite:///var/lib/mesh/mesh.db`
//! - `MESH__SCHEDULER__LEASE_DURATION=15m`
//!
//! The shared secret is read from `MESH_SHARED_SECRET`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/mesh.toml`.
//! This can be overridden using the `MESH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    AuthConfig, Config, DatabaseConfig, ReaperConfig, SchedulerConfig, ServerConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. `MESH_SHARED_SECRET` for the shared secret
    /// 2. Environment variables (`MESH__*`)
    /// 3. TOML file (default: `config/mesh.toml`)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from `path` instead of `MESH_CONFIG`, still applying
    /// `.env` and `MESH_SHARED_SECRET`
    pub fn load_file(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_file(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Skips `.env` and `MESH_SHARED_SECRET`; the file (or `MESH__AUTH__SHARED_SECRET`)
    /// must provide the secret.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
