use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "MESH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/mesh.toml";
const ENV_PREFIX: &str = "MESH";
const ENV_SEPARATOR: &str = "__";
const SECRET_ENV_VAR: &str = "MESH_SHARED_SECRET";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_with_secrets(config_path)
}

/// Same as [`load`] with an explicit file instead of `MESH_CONFIG`
pub fn load_file(config_path: PathBuf) -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    load_with_secrets(config_path)
}

fn load_with_secrets(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);
    Ok(config)
}

/// The shared secret is expected in the environment, not in TOML files.
/// `MESH_SHARED_SECRET` wins over anything loaded before it.
fn load_secrets(config: &mut Config) {
    if let Ok(secret) = env::var(SECRET_ENV_VAR) {
        config.auth.shared_secret = Some(secret);
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // MESH__SCHEDULER__LEASE_DURATION -> scheduler.lease_duration
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.scheduler.max_jobs_per_lease, 100);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
max_request_bytes = "2MB"

[database]
url = "sqlite://var/mesh.db"
max_connections = 4

[scheduler]
lease_duration = "15m"
max_jobs_per_lease = 25
max_workers_per_site = 3
max_attempts = 0
reject_foreign_finish = false
max_payload_bytes = "64KB"

[reaper]
enabled = false
interval = "1m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.max_request_bytes.as_u64(), 2 * 1024 * 1024);
        assert_eq!(config.database.url, "sqlite://var/mesh.db");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(
            config.scheduler.lease_duration.as_duration(),
            Duration::from_secs(900)
        );
        assert_eq!(config.scheduler.max_jobs_per_lease, 25);
        assert_eq!(config.scheduler.max_workers_per_site, 3);
        assert_eq!(config.scheduler.max_attempts, 0);
        assert!(!config.scheduler.reject_foreign_finish);
        assert_eq!(config.scheduler.max_payload_bytes.as_u64(), 64 * 1024);
        assert!(!config.reaper.enabled);
        assert_eq!(config.reaper.interval.as_duration(), Duration::from_secs(60));
    }

    // Environment overrides are not exercised here: mutating process env in
    // parallel tests is unsafe under edition 2024.
}
