//! Page persistence traits and error types
//!
//! This module defines the trait interface for page sinks and the errors
//! they can raise.

use crate::bucket::DateBucket;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for page sinks
///
/// A persister receives every fetched page exactly once, in page order per
/// bucket. Implementations overwrite rather than append, so persisting the
/// same `(bucket, page_index)` again replaces the previous artifact.
pub trait PagePersister: Send + Sync {
    /// Stores one page's raw payload
    ///
    /// # Arguments
    ///
    /// * `bucket` - The bucket the page belongs to
    /// * `page_index` - 1-based page number within the bucket
    /// * `payload` - The response body, stored as-is
    fn persist(
        &self,
        bucket: &DateBucket,
        page_index: u32,
        payload: &[u8],
    ) -> impl Future<Output = OutputResult<()>> + Send;
}

/// Returns the artifact name for a page, without directory
///
/// # Examples
///
/// ```
/// use food_event_harvester::{parse_ymd, DateBucket};
/// use food_event_harvester::output::artifact_name;
///
/// let bucket = DateBucket::new(parse_ymd("20000101").unwrap(), parse_ymd("20000131").unwrap()).unwrap();
/// assert_eq!(artifact_name(&bucket, 3), "food_event_20000101_20000131_p3.json");
/// ```
pub fn artifact_name(bucket: &DateBucket, page_index: u32) -> String {
    format!(
        "food_event_{}_{}_p{}.json",
        bucket.start_ymd(),
        bucket.end_ymd(),
        page_index
    )
}
