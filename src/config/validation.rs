use crate::config::types::{Config, OriginConfig, OutputConfig, RateLimitConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_origin_config(&config.origin)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates origin configuration
fn validate_origin_config(config: &OriginConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(
            "base_url must have a host".to_string(),
        ));
    }

    if let Some(ua) = &config.user_agent {
        if ua.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates rate limit configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.calls < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit calls must be >= 1, got {}",
            config.calls
        )));
    }

    if config.period_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit period-secs must be >= 1, got {}",
            config.period_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.cache_path.is_empty() {
        return Err(ConfigError::Validation(
            "cache_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
