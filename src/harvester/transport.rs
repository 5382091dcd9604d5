//! HTTP transport with response classification and backoff
//!
//! This module handles every request the harvester makes, including:
//! - Building the HTTP client with user agent and per-request timeout
//! - Attaching the API credential to outbound requests
//! - Classifying responses into success, transient, and fatal outcomes
//! - Sleeping with exponential backoff (or the server's `Retry-After` hint)
//!   before repeating a transient failure
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return parsed body |
//! | HTTP 429 | Wait `Retry-After` or backoff, retry without limit |
//! | HTTP 5xx | Wait `Retry-After` or backoff, retry without limit |
//! | Other status | Immediate → `HarvestError::Http` |
//! | Body is not JSON | Immediate → `HarvestError::Parse` |
//! | Connection error / timeout | Immediate → `HarvestError::Network` |

use crate::config::{ApiConfig, ApiKey};
use crate::HarvestError;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Characters of the response body kept in `HarvestError::Http`
pub const ERROR_EXCERPT_CHARS: usize = 160;

/// Query parameter carrying the API credential
const API_KEY_PARAM: &str = "api_key";

/// A single unclassified HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    /// Raw `Link` header value, if any
    pub link: Option<String>,
    /// Response body bytes
    pub body: Vec<u8>,
}

/// A successful response whose body parsed as JSON
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub link: Option<String>,
    /// The body exactly as received
    pub body: Vec<u8>,
    /// The body parsed as JSON
    pub json: serde_json::Value,
}

/// Issues a single GET request without interpreting the status code
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, HarvestError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Production transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    api_key: Option<ApiKey>,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport from the API configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config).map_err(|e| HarvestError::Network {
            url: config.base_url.clone(),
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        })
    }

    /// Whether the URL still needs the credential attached
    ///
    /// Pagination links handed out by the server usually carry the key
    /// already; adding it twice would send a duplicate parameter.
    fn needs_api_key(url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => !parsed.query_pairs().any(|(k, _)| k == API_KEY_PARAM),
            Err(_) => true,
        }
    }

    fn classify_error(&self, url: &str, error: reqwest::Error) -> HarvestError {
        // The request URL may carry the key
        let error = error.without_url();
        let message = if error.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            error.to_string()
        };

        HarvestError::Network {
            url: redact_url(url),
            message,
        }
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, HarvestError> {
        let mut request = self.client.get(url);

        if let Some(key) = &self.api_key {
            if Self::needs_api_key(url) {
                request = request.query(&[(API_KEY_PARAM, key.expose())]);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_error(url, e))?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let retry_after = header_value(headers, RETRY_AFTER);
        let link = header_value(headers, LINK);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify_error(url, e))?
            .to_vec();

        Ok(RawResponse {
            status,
            retry_after,
            link,
            body,
        })
    }
}

/// Joins all values of a header, or None if it is absent
fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Backoff settings for transient responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the second attempt; doubles for every further attempt
    pub initial_backoff: Duration,
    /// Ceiling on the computed backoff (does not cap `Retry-After`)
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for a 1-based attempt number
    ///
    /// `min(max_backoff, initial_backoff × 2^(attempt-1))`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let initial_ms = self.initial_backoff.as_millis() as u64;

        Duration::from_millis(initial_ms.saturating_mul(factor)).min(self.max_backoff)
    }

    /// The wait before repeating a transient failure
    ///
    /// A positive numeric `Retry-After` (in seconds) wins over the backoff.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        retry_after
            .and_then(parse_retry_after)
            .unwrap_or_else(|| self.backoff(attempt))
    }
}

/// Parses a `Retry-After` value given in seconds
///
/// HTTP-date forms, zero, and negative values yield None.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// How a single attempt was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx
    Success,
    /// 429 or 5xx; retried after a wait
    Transient,
    /// Any other status; not retried
    Fatal,
}

impl AttemptOutcome {
    pub fn classify(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            429 => Self::Transient,
            s if s >= 500 => Self::Transient,
            _ => Self::Fatal,
        }
    }
}

/// One attempt at a URL, kept only long enough to log and pick a wait
#[derive(Debug)]
struct FetchAttempt<'a> {
    url: &'a str,
    attempt: u32,
    status: u16,
    outcome: AttemptOutcome,
}

impl FetchAttempt<'_> {
    fn log_backoff(&self, wait: Duration) {
        tracing::warn!(
            status = self.status,
            attempt = self.attempt,
            wait_ms = wait.as_millis() as u64,
            url = %redact_url(self.url),
            "Transient response, retrying"
        );
    }
}

/// Transport wrapper that retries transient failures indefinitely
#[derive(Debug, Clone)]
pub struct ResilientTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> ResilientTransport<T> {
    /// Wraps a transport with the default retry policy
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches a URL until it succeeds or fails fatally
    ///
    /// Transient statuses (429, 5xx) are never returned as errors; the loop
    /// keeps waiting and repeating the same request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch, used verbatim
    ///
    /// # Returns
    ///
    /// * `Ok(ApiResponse)` - A 2xx response with a JSON body
    /// * `Err(HarvestError::Http)` - A non-retryable status
    /// * `Err(HarvestError::Parse)` - A 2xx response whose body is not JSON
    /// * `Err(HarvestError::Network)` - The request itself failed
    pub async fn execute(&self, url: &str) -> Result<ApiResponse, HarvestError> {
        let mut attempt: u32 = 1;

        loop {
            let response = self.inner.get(url).await?;
            let current = FetchAttempt {
                url,
                attempt,
                status: response.status,
                outcome: AttemptOutcome::classify(response.status),
            };

            match current.outcome {
                AttemptOutcome::Success => {
                    if current.attempt > 1 {
                        tracing::debug!(attempt = current.attempt, "Request succeeded after retry");
                    }
                    return decode(url, response);
                }
                AttemptOutcome::Transient => {
                    let wait = self
                        .policy
                        .delay_for(current.attempt, response.retry_after.as_deref());
                    current.log_backoff(wait);
                    tokio::time::sleep(wait).await;
                    attempt = attempt.saturating_add(1);
                }
                AttemptOutcome::Fatal => {
                    return Err(HarvestError::Http {
                        status: current.status,
                        excerpt: excerpt(&response.body),
                    });
                }
            }
        }
    }
}

fn decode(url: &str, response: RawResponse) -> Result<ApiResponse, HarvestError> {
    let json = serde_json::from_slice(&response.body).map_err(|e| HarvestError::Parse {
        url: redact_url(url),
        message: e.to_string(),
    })?;

    Ok(ApiResponse {
        status: response.status,
        link: response.link,
        body: response.body,
        json,
    })
}

/// First [`ERROR_EXCERPT_CHARS`] characters of a body, lossily decoded
pub fn excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(ERROR_EXCERPT_CHARS)
        .collect()
}

/// Replaces the API credential in a URL so it can be logged
///
/// # Examples
///
/// ```
/// use food_event_harvester::harvester::redact_url;
///
/// let url = "https://api.example.com/e.json?api_key=s3cret&limit=100";
/// assert_eq!(redact_url(url), "https://api.example.com/e.json?api_key=REDACTED&limit=100");
/// ```
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return if raw.contains(API_KEY_PARAM) {
            "<unparseable url>".to_string()
        } else {
            raw.to_string()
        };
    };

    if !url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == API_KEY_PARAM {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}
