use super::{types::Config, ConfigError};

/// Smallest part size accepted by S3 for all but the last part.
pub const MIN_PART_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Validate configuration
///
/// `needs_storage` is false for modes that never upload (single-URL probe).
pub fn validate_config(config: &Config, needs_storage: bool) -> Result<(), ConfigError> {
    if config.session.endpoint.is_none() && config.session.profile_dir.is_none() {
        return Err(ConfigError::ValidationError(
            "either session.endpoint or session.profile_dir must be set".to_string(),
        ));
    }

    if config.resolver.manifest_timeout_secs == 0 || config.session.navigation_timeout_secs == 0
    {
        return Err(ConfigError::ValidationError(
            "timeouts cannot be 0".to_string(),
        ));
    }

    if !needs_storage {
        return Ok(());
    }

    let storage = &config.storage;
    if storage.bucket.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::ValidationError(
            "storage.bucket is required".to_string(),
        ));
    }
    if storage.region.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::ValidationError(
            "storage.region is required".to_string(),
        ));
    }
    if storage.access_key_id.is_some() != storage.secret_access_key.is_some() {
        return Err(ConfigError::ValidationError(
            "storage.access_key_id and storage.secret_access_key must be set together"
                .to_string(),
        ));
    }
    if storage.part_size_bytes < MIN_PART_SIZE_BYTES {
        return Err(ConfigError::ValidationError(format!(
            "storage.part_size_bytes must be at least {}",
            MIN_PART_SIZE_BYTES
        )));
    }
    if storage.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "storage.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.session.endpoint = Some("ws://localhost:9222/devtools/browser/x".to_string());
        config.storage.bucket = Some("lectures".to_string());
        config.storage.region = Some("eu-west-3".to_string());
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config(), true).is_ok());
    }

    #[test]
    fn test_validate_missing_session_fails() {
        let mut config = valid_config();
        config.session.endpoint = None;
        let result = validate_config(&config, false);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_missing_bucket_only_matters_for_storage() {
        let mut config = valid_config();
        config.storage.bucket = None;
        assert!(validate_config(&config, false).is_ok());
        assert!(matches!(
            validate_config(&config, true),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_half_credentials_fails() {
        let mut config = valid_config();
        config.storage.access_key_id = Some("AKIA".to_string());
        assert!(validate_config(&config, true).is_err());
    }

    #[test]
    fn test_validate_small_part_size_fails() {
        let mut config = valid_config();
        config.storage.part_size_bytes = 1024;
        assert!(validate_config(&config, true).is_err());
    }
}
