//! Configuration module for Food-Event-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and layering environment variable overrides on top.
//!
//! # Example
//!
//! ```no_run
//! use food_event_harvester::config::load_effective_config;
//! use std::path::Path;
//!
//! let config = load_effective_config(Some(Path::new("harvest.toml")), |name| {
//!     std::env::var(name).ok()
//! })
//! .unwrap();
//! println!("Harvesting {}..{}", config.harvest.start_date, config.harvest.end_date);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, ApiKey, Config, HarvestConfig, OutputConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_effective_config, ENV_API_KEY,
    ENV_BASE_URL, ENV_CONCURRENCY, ENV_DATA_DIR, ENV_END_DATE, ENV_PAGE_SIZE, ENV_START_DATE,
};
pub use validation::validate;
