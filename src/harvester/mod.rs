//! Harvester module for paginated, date-partitioned downloads
//!
//! This module contains the core harvesting logic, including:
//! - HTTP transport with indefinite retry of transient failures
//! - First-page URL construction and `Link`-header pagination
//! - Worker scheduling across a bounded pool
//! - Overall harvest coordination

mod pager;
mod reporter;
mod request;
mod scheduler;
mod transport;

pub use pager::{count_records, parse_next_link, PageResult, PageWalker, Pager};
pub use reporter::{HarvestEvent, HarvestReporter, TracingReporter};
pub use request::QueryBuilder;
pub use scheduler::{Scheduler, WorkQueue};
pub use transport::{
    build_http_client, excerpt, parse_retry_after, redact_url, ApiResponse, AttemptOutcome,
    RawResponse, ReqwestTransport, ResilientTransport, RetryPolicy, Transport,
    ERROR_EXCERPT_CHARS,
};

use crate::bucket::{parse_ymd, partition, DateBucket};
use crate::config::Config;
use crate::output::{FilePersister, RunSummary};
use crate::HarvestError;
use std::sync::Arc;

/// Main harvest coordinator
///
/// Owns the bucket plan and the configured scheduler. Creating one makes the
/// output directory; no request is sent until [`Harvester::run`] is called.
pub struct Harvester {
    buckets: Vec<DateBucket>,
    concurrency: usize,
    scheduler: Scheduler<ReqwestTransport, FilePersister>,
}

impl Harvester {
    /// Creates a harvester from a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The effective configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Bad date range, base URL, or output directory
    pub async fn new(config: &Config) -> Result<Self, HarvestError> {
        let buckets = plan(config)?;
        let persister = FilePersister::create(&config.output.data_dir).await?;
        let transport = ReqwestTransport::from_config(&config.api)?;
        let pager = Pager::new(
            ResilientTransport::new(transport),
            QueryBuilder::from_config(config)?,
            config.harvest.pacing(),
        );

        let scheduler = Scheduler::new(pager, persister)
            .with_reporter(Arc::new(TracingReporter))
            .with_progress_every(config.harvest.progress_every);

        Ok(Self {
            buckets,
            concurrency: config.harvest.concurrency,
            scheduler,
        })
    }

    pub fn buckets(&self) -> &[DateBucket] {
        &self.buckets
    }

    /// Harvests every planned bucket
    pub async fn run(self) -> Result<RunSummary, HarvestError> {
        self.scheduler.run(self.buckets, self.concurrency).await
    }
}

/// Splits the configured range into monthly buckets
///
/// # Returns
///
/// * `Ok(Vec<DateBucket>)` - Buckets in chronological order
/// * `Err(HarvestError)` - A date failed to parse or the range is inverted
pub fn plan(config: &Config) -> Result<Vec<DateBucket>, HarvestError> {
    let start = parse_ymd(&config.harvest.start_date)?;
    let end = parse_ymd(&config.harvest.end_date)?;
    partition(start, end)
}

/// Runs a complete harvest
///
/// This is the main entry point for a download run. It will:
/// 1. Partition the date range into monthly buckets
/// 2. Create the output directory
/// 3. Build the HTTP client
/// 4. Walk every bucket with the configured number of workers
/// 5. Return the run totals
///
/// # Arguments
///
/// * `config` - The effective configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every bucket was fully harvested
/// * `Err(HarvestError)` - The first fatal error of the run
pub async fn harvest(config: &Config) -> Result<RunSummary, HarvestError> {
    let harvester = Harvester::new(config).await?;

    tracing::info!(
        buckets = harvester.buckets().len(),
        concurrency = config.harvest.concurrency,
        page_size = config.harvest.page_size,
        data_dir = %config.output.data_dir,
        "Harvest planned"
    );

    harvester.run().await
}
