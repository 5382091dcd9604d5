//! Food-Event-Harvester: a courteous bulk downloader for date-partitioned APIs
//!
//! This crate splits a date range into monthly buckets, walks each bucket's
//! paginated result set with a small pool of workers, and writes every page
//! verbatim to disk.

pub mod bucket;
pub mod config;
pub mod harvester;
pub mod output;
pub mod state;


use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid date '{0}': expected YYYYMMDD")]
    InvalidDate(String),

    #[error("HTTP {status}: {excerpt}")]
    Http { status: u16, excerpt: String },

    #[error("Malformed response body from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid worker transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::WorkerState,
        to: state::WorkerState,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl HarvestError {
    /// Returns true if the error was raised before any request was issued
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange { .. } | Self::InvalidDate(_) | Self::Config(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use bucket::{format_ymd, parse_ymd, partition, DateBucket};
pub use config::Config;
pub use harvester::{harvest, plan, Harvester, Scheduler};
pub use output::{FilePersister, PagePersister, RunSummary, RunTotals};
pub use state::WorkerState;
