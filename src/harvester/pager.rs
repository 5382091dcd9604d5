//! Pagination over a single bucket
//!
//! A bucket's first URL is built locally; each later URL is the `next`
//! target of the previous response's `Link` header, followed verbatim.
//! The walk ends when a response carries no `next` link.

use crate::bucket::DateBucket;
use crate::harvester::request::QueryBuilder;
use crate::harvester::transport::{ResilientTransport, Transport};
use crate::HarvestError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One fetched page of a bucket
#[derive(Debug, Clone)]
pub struct PageResult {
    pub bucket: DateBucket,
    /// 1-based position of the page within its bucket
    pub page_index: u32,
    /// Response body exactly as received
    pub payload: Vec<u8>,
    /// Length of the body's `results` array (0 if missing)
    pub record_count: usize,
    /// URL of the following page, if the server announced one
    pub next_cursor: Option<String>,
}

/// Extracts the `rel="next"` target from a `Link` header
///
/// Entries look like `<url>; rel="next"`. Relation matching is
/// case-insensitive and tolerates unquoted or multi-valued `rel`.
///
/// # Examples
///
/// ```
/// use food_event_harvester::harvester::parse_next_link;
///
/// let header = r#"<https://api.example.com/e.json?skip=100>; rel="next""#;
/// assert_eq!(parse_next_link(header).as_deref(), Some("https://api.example.com/e.json?skip=100"));
/// assert_eq!(parse_next_link(r#"<https://x/>; rel="prev""#), None);
/// ```
pub fn parse_next_link(header: &str) -> Option<String> {
    let mut rest = header;

    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let close = after_open.find('>')?;
        let target = &after_open[..close];
        let tail = &after_open[close + 1..];

        // Parameters run until the next entry's '<'
        let params_end = tail.find('<').unwrap_or(tail.len());
        let params = &tail[..params_end];

        if has_next_relation(params) {
            let target = target.trim();
            return (!target.is_empty()).then(|| target.to_string());
        }

        rest = &tail[params_end..];
    }

    None
}

fn has_next_relation(params: &str) -> bool {
    params
        .split(|c: char| c == ';' || c == ',')
        .map(str::trim)
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("rel")
                .then(|| value.trim().trim_matches('"'))
        })
        .any(|value| {
            value
                .split_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("next"))
        })
}

/// Number of records in a parsed response
///
/// The length of the top-level `results` array; 0 when it is absent or
/// not an array.
pub fn count_records(json: &Value) -> usize {
    json.get("results")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

/// Walks buckets page by page through a shared transport
pub struct Pager<T> {
    transport: Arc<ResilientTransport<T>>,
    queries: Arc<QueryBuilder>,
    pacing: Duration,
}

impl<T> Clone for Pager<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            queries: Arc::clone(&self.queries),
            pacing: self.pacing,
        }
    }
}

impl<T: Transport> Pager<T> {
    /// Creates a pager
    ///
    /// # Arguments
    ///
    /// * `transport` - Retrying transport shared by every walk
    /// * `queries` - Builds each bucket's first URL
    /// * `pacing` - Pause before every request of a bucket except the first
    pub fn new(transport: ResilientTransport<T>, queries: QueryBuilder, pacing: Duration) -> Self {
        Self {
            transport: Arc::new(transport),
            queries: Arc::new(queries),
            pacing,
        }
    }

    /// Starts a walk over one bucket
    pub fn pages(&self, bucket: DateBucket) -> PageWalker<'_, T> {
        PageWalker {
            pager: self,
            bucket,
            next_url: Some(self.queries.first_page_url(&bucket)),
            page_index: 0,
        }
    }
}

/// Lazy, single-pass page sequence for one bucket
///
/// Pages come out in order with consecutive indices starting at 1. After
/// the last page or the first error the walker yields `Ok(None)`.
pub struct PageWalker<'a, T> {
    pager: &'a Pager<T>,
    bucket: DateBucket,
    next_url: Option<String>,
    page_index: u32,
}

impl<T: Transport> PageWalker<'_, T> {
    /// Pages yielded so far
    pub fn pages_fetched(&self) -> u32 {
        self.page_index
    }

    /// Fetches the next page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(PageResult))` - The next page
    /// * `Ok(None)` - The bucket is exhausted
    /// * `Err(HarvestError)` - A fatal fetch error; the walk is over
    pub async fn next_page(&mut self) -> Result<Option<PageResult>, HarvestError> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        if self.page_index > 0 && !self.pager.pacing.is_zero() {
            tokio::time::sleep(self.pager.pacing).await;
        }

        let response = self.pager.transport.execute(&url).await?;
        self.page_index += 1;

        let record_count = count_records(&response.json);
        let next_cursor = response.link.as_deref().and_then(parse_next_link);
        self.next_url = next_cursor.clone();

        tracing::trace!(
            bucket = %self.bucket,
            page = self.page_index,
            records = record_count,
            has_next = next_cursor.is_some(),
            "Fetched page"
        );

        Ok(Some(PageResult {
            bucket: self.bucket,
            page_index: self.page_index,
            payload: response.body,
            record_count,
            next_cursor,
        }))
    }
}
