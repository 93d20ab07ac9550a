use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Shared secret is not configured (set MESH_SHARED_SECRET or auth.shared_secret)")]
    MissingSharedSecret,

    #[error("Database URL must not be empty")]
    EmptyDatabaseUrl,

    #[error("Database max_connections must be at least 1")]
    NoDatabaseConnections,

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },

    #[error("Limit must be positive: {field}")]
    ZeroLimit { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_auth(config)?;
    validate_database(config)?;
    validate_scheduler(config)?;
    validate_reaper(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_auth(config: &Config) -> Result<(), ValidationError> {
    match config.auth.shared_secret.as_deref() {
        Some(secret) if !secret.is_empty() => Ok(()),
        _ => Err(ValidationError::MissingSharedSecret),
    }
}

fn validate_database(config: &Config) -> Result<(), ValidationError> {
    if config.database.url.trim().is_empty() {
        return Err(ValidationError::EmptyDatabaseUrl);
    }
    if config.database.max_connections == 0 {
        return Err(ValidationError::NoDatabaseConnections);
    }
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<(), ValidationError> {
    let scheduler = &config.scheduler;

    if scheduler.lease_duration.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "scheduler.lease_duration",
        });
    }
    if scheduler.max_jobs_per_lease == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "scheduler.max_jobs_per_lease",
        });
    }
    if scheduler.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "scheduler.max_payload_bytes",
        });
    }
    Ok(())
}

fn validate_reaper(config: &Config) -> Result<(), ValidationError> {
    // A disabled reaper may carry any interval
    if config.reaper.enabled && config.reaper.interval.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "reaper.interval",
        });
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_request_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "server.max_request_bytes",
        });
    }
    if config.server.max_concurrent_requests == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "server.max_concurrent_requests",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.shared_secret = Some("s3cret".to_string());
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let mut config = valid_config();
        config.auth.shared_secret = None;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingSharedSecret)
        ));

        config.auth.shared_secret = Some(String::new());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingSharedSecret)
        ));
    }

    #[test]
    fn test_zero_lease_duration_rejected() {
        let mut config = valid_config();
        config.scheduler.lease_duration = HumanDuration::from_secs(0);

        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ZeroDuration {
                field: "scheduler.lease_duration"
            }
        ));
    }

    #[test]
    fn test_zero_reaper_interval_only_matters_when_enabled() {
        let mut config = valid_config();
        config.reaper.interval = HumanDuration::from_secs(0);
        assert!(validate(&config).is_err());

        config.reaper.enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_database_limits() {
        let mut config = valid_config();
        config.database.max_connections = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::NoDatabaseConnections)
        ));

        let mut config = valid_config();
        config.database.url = "  ".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyDatabaseUrl)
        ));
    }

    #[test]
    fn test_zero_batch_cap_rejected() {
        let mut config = valid_config();
        config.scheduler.max_jobs_per_lease = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroLimit { .. })
        ));
    }
}
