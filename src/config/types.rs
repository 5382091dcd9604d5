use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Food-Event-Harvester
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Harvest range and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// First day of the overall range (YYYYMMDD)
    #[serde(rename = "start-date", default = "default_start_date")]
    pub start_date: String,

    /// Last day of the overall range, inclusive (YYYYMMDD)
    #[serde(rename = "end-date", default = "default_end_date")]
    pub end_date: String,

    /// Number of concurrent bucket workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Records requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Delay between consecutive page requests within a bucket (milliseconds)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Emit a progress line every N pages of a bucket
    #[serde(rename = "progress-every", default = "default_progress_every")]
    pub progress_every: u32,
}

/// Upstream API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint receiving the first request of every bucket
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Record field the date range is searched on
    #[serde(rename = "search-field", default = "default_search_field")]
    pub search_field: String,

    /// Sort expression sent with the first request
    #[serde(default = "default_sort")]
    pub sort: String,

    /// User-Agent header value
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API credential, attached to every outbound request
    #[serde(rename = "api-key", default)]
    pub api_key: Option<ApiKey>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one file per fetched page
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,
}

/// An opaque API credential
///
/// The value never appears in `Debug` output or log lines.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw credential for attaching to a request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl HarvestConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
            concurrency: default_concurrency(),
            page_size: default_page_size(),
            pacing_ms: default_pacing_ms(),
            progress_every: default_progress_every(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_field: default_search_field(),
            sort: default_sort(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_start_date() -> String {
    "20000101".to_string()
}

fn default_end_date() -> String {
    "20250930".to_string()
}

fn default_concurrency() -> usize {
    3
}

fn default_page_size() -> u32 {
    100
}

fn default_pacing_ms() -> u64 {
    30
}

fn default_progress_every() -> u32 {
    25
}

fn default_base_url() -> String {
    "https://api.fda.gov/food/event.json".to_string()
}

fn default_search_field() -> String {
    "date_started".to_string()
}

fn default_sort() -> String {
    "date_started:asc".to_string()
}

fn default_user_agent() -> String {
    format!("food-event-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_data_dir() -> String {
    "./data".to_string()
}
