use crate::config::types::{ApiKey, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables recognised by [`apply_env_overrides`]
pub const ENV_START_DATE: &str = "HARVEST_START_DATE";
pub const ENV_END_DATE: &str = "HARVEST_END_DATE";
pub const ENV_CONCURRENCY: &str = "CONCURRENCY_LIMIT";
pub const ENV_PAGE_SIZE: &str = "HARVEST_PAGE_SIZE";
pub const ENV_DATA_DIR: &str = "HARVEST_DATA_DIR";
pub const ENV_BASE_URL: &str = "HARVEST_BASE_URL";
pub const ENV_API_KEY: &str = "API_KEY";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are not applied here; see [`load_effective_config`].
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use food_event_harvester::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Concurrency: {}", config.harvest.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Builds the configuration the harvest will actually run with
///
/// Starts from the TOML file when one is given (defaults otherwise), applies
/// environment overrides from `lookup`, then validates the result.
///
/// # Arguments
///
/// * `path` - Optional path to the TOML configuration file
/// * `lookup` - Environment accessor, usually `|name| std::env::var(name).ok()`
pub fn load_effective_config<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate(&config)?;
    Ok(config)
}

/// Overwrites configuration values with any set environment variables
///
/// Empty values are ignored so that `API_KEY=` in a `.env` file does not
/// replace a key from the config file with nothing.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = get(ENV_START_DATE) {
        config.harvest.start_date = value;
    }

    if let Some(value) = get(ENV_END_DATE) {
        config.harvest.end_date = value;
    }

    if let Some(value) = get(ENV_CONCURRENCY) {
        config.harvest.concurrency = parse_env(ENV_CONCURRENCY, &value)?;
    }

    if let Some(value) = get(ENV_PAGE_SIZE) {
        config.harvest.page_size = parse_env(ENV_PAGE_SIZE, &value)?;
    }

    if let Some(value) = get(ENV_DATA_DIR) {
        config.output.data_dir = value;
    }

    if let Some(value) = get(ENV_BASE_URL) {
        config.api.base_url = value;
    }

    if let Some(value) = get(ENV_API_KEY) {
        config.api.api_key = Some(ApiKey::new(value));
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Computes a SHA-256 fingerprint of the effective configuration
///
/// The API key is left out; runs that differ only in credentials share a
/// fingerprint.
///
/// # Returns
///
/// Hex-encoded SHA-256 of the canonical settings string (64 characters)
pub fn compute_config_hash(config: &Config) -> String {
    let canonical = format!(
        "start={};end={};concurrency={};page-size={};pacing-ms={};base-url={};search-field={};sort={};data-dir={}",
        config.harvest.start_date,
        config.harvest.end_date,
        config.harvest.concurrency,
        config.harvest.page_size,
        config.harvest.pacing_ms,
        config.api.base_url,
        config.api.search_field,
        config.api.sort,
        config.output.data_dir,
    );

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
