use crate::bucket::parse_ymd;
use crate::config::types::{ApiConfig, Config, HarvestConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Range ordering (`start-date <= end-date`) is left to the partitioner so
/// that it surfaces as `HarvestError::InvalidRange`.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvest range and pacing configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("start-date", &config.start_date),
        ("end-date", &config.end_date),
    ] {
        parse_ymd(value).map_err(|_| {
            ConfigError::Validation(format!("{} must be a YYYYMMDD date, got '{}'", name, value))
        })?;
    }

    if config.concurrency < 1 {
        return Err(ConfigError::Validation(
            "concurrency must be >= 1".to_string(),
        ));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page-size must be >= 1".to_string(),
        ));
    }

    if config.progress_every < 1 {
        return Err(ConfigError::Validation(
            "progress-every must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.search_field.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search-field cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
