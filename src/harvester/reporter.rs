use crate::bucket::DateBucket;
use crate::HarvestError;

/// Observable events in a harvest worker's lifecycle
#[derive(Debug)]
pub enum HarvestEvent<'a> {
    WorkerStarted {
        worker_id: usize,
    },
    BucketClaimed {
        worker_id: usize,
        bucket: &'a DateBucket,
    },
    /// Emitted every `progress-every` pages within a bucket
    PageProgress {
        worker_id: usize,
        bucket: &'a DateBucket,
        pages: u32,
        records: u64,
    },
    BucketCompleted {
        worker_id: usize,
        bucket: &'a DateBucket,
        pages: u32,
        records: u64,
    },
    WorkerFailed {
        worker_id: usize,
        bucket: &'a DateBucket,
        error: &'a HarvestError,
    },
    /// The worker found no more work, or the run was cancelled
    WorkerStopped {
        worker_id: usize,
        cancelled: bool,
    },
}

/// Receives harvest events for logging or metrics
///
/// All methods have default no-op implementations.
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl HarvestReporter for TracingReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::WorkerStarted { worker_id } => {
                tracing::debug!(worker_id, "Worker started");
            }
            HarvestEvent::BucketClaimed { worker_id, bucket } => {
                tracing::info!(worker_id, %bucket, "Bucket claimed");
            }
            HarvestEvent::PageProgress {
                worker_id,
                bucket,
                pages,
                records,
            } => {
                tracing::info!(worker_id, %bucket, pages, records, "Bucket progress");
            }
            HarvestEvent::BucketCompleted {
                worker_id,
                bucket,
                pages,
                records,
            } => {
                tracing::info!(worker_id, %bucket, pages, records, "Bucket done");
            }
            HarvestEvent::WorkerFailed {
                worker_id,
                bucket,
                error,
            } => {
                // The run's single fatal line is printed by the caller
                tracing::warn!(worker_id, %bucket, %error, "Bucket abandoned");
            }
            HarvestEvent::WorkerStopped {
                worker_id,
                cancelled,
            } => {
                tracing::debug!(worker_id, cancelled, "Worker stopped");
            }
        }
    }
}
