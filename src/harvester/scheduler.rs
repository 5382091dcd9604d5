//! Bucket scheduling across a fixed pool of workers
//!
//! Workers pull buckets from a shared queue in partition order. Each bucket
//! is claimed by exactly one worker. The first fatal error stops further
//! claims; buckets already in flight finish their current walk.

use crate::bucket::DateBucket;
use crate::harvester::pager::Pager;
use crate::harvester::reporter::{HarvestEvent, HarvestReporter, TracingReporter};
use crate::harvester::transport::Transport;
use crate::output::{PagePersister, RunSummary, RunTotals};
use crate::state::{WorkerLifecycle, WorkerState};
use crate::HarvestError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Ordered buckets handed out one at a time
#[derive(Debug)]
pub struct WorkQueue {
    buckets: Vec<DateBucket>,
    cursor: AtomicUsize,
    cancel: CancellationToken,
}

impl WorkQueue {
    pub fn new(buckets: Vec<DateBucket>) -> Self {
        Self {
            buckets,
            cursor: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Claims the next unclaimed bucket
    ///
    /// Returns None once the queue is exhausted or cancelled. The cursor
    /// advance is a single atomic step, so concurrent callers never receive
    /// the same bucket.
    pub fn claim(&self) -> Option<DateBucket> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.buckets.get(index).copied()
    }

    /// Stops all further claims
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Runs buckets through a pool of workers
pub struct Scheduler<T, P> {
    pager: Pager<T>,
    persister: Arc<P>,
    reporter: Arc<dyn HarvestReporter>,
    progress_every: u32,
}

impl<T, P> Scheduler<T, P>
where
    T: Transport + 'static,
    P: PagePersister + 'static,
{
    /// Creates a scheduler that logs through `tracing`
    pub fn new(pager: Pager<T>, persister: P) -> Self {
        Self {
            pager,
            persister: Arc::new(persister),
            reporter: Arc::new(TracingReporter),
            progress_every: 25,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn HarvestReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets how often (in pages) a progress event is emitted
    pub fn with_progress_every(mut self, pages: u32) -> Self {
        self.progress_every = pages.max(1);
        self
    }

    /// Harvests every bucket with at most `concurrency` concurrent walks
    ///
    /// Buckets are claimed in the order given. A worker that hits a fatal
    /// error cancels the queue; the remaining workers finish the bucket they
    /// hold and then stop.
    ///
    /// # Arguments
    ///
    /// * `buckets` - Buckets in partition order
    /// * `concurrency` - Worker count (values below 1 are treated as 1)
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every bucket was fully harvested
    /// * `Err(HarvestError)` - The first fatal error of the run
    pub async fn run(
        &self,
        buckets: Vec<DateBucket>,
        concurrency: usize,
    ) -> Result<RunSummary, HarvestError> {
        let started = Instant::now();
        let buckets_total = buckets.len();
        let queue = Arc::new(WorkQueue::new(buckets));
        let totals = Arc::new(RunTotals::new());
        let workers = concurrency.max(1);

        tracing::info!(buckets = buckets_total, workers, "Starting harvest");

        let mut set = JoinSet::new();
        for worker_id in 1..=workers {
            let worker = Worker {
                id: worker_id,
                queue: Arc::clone(&queue),
                totals: Arc::clone(&totals),
                pager: self.pager.clone(),
                persister: Arc::clone(&self.persister),
                reporter: Arc::clone(&self.reporter),
                progress_every: self.progress_every,
            };
            set.spawn(worker.run());
        }

        let mut first_error: Option<HarvestError> = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .map_err(|e| HarvestError::Worker(e.to_string()))
                .and_then(|result| result);

            if let Err(error) = outcome {
                queue.cancel();
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(totals.snapshot(buckets_total, started.elapsed())),
        }
    }
}

struct Worker<T, P> {
    id: usize,
    queue: Arc<WorkQueue>,
    totals: Arc<RunTotals>,
    pager: Pager<T>,
    persister: Arc<P>,
    reporter: Arc<dyn HarvestReporter>,
    progress_every: u32,
}

impl<T: Transport, P: PagePersister> Worker<T, P> {
    async fn run(self) -> Result<(), HarvestError> {
        let mut lifecycle = WorkerLifecycle::new(self.id);
        self.reporter
            .report(HarvestEvent::WorkerStarted { worker_id: self.id });

        while let Some(bucket) = self.queue.claim() {
            lifecycle.advance(WorkerState::Claimed)?;
            self.reporter.report(HarvestEvent::BucketClaimed {
                worker_id: self.id,
                bucket: &bucket,
            });

            match self.harvest_bucket(bucket, &mut lifecycle).await {
                Ok((pages, records)) => {
                    self.totals.record_bucket(records);
                    self.reporter.report(HarvestEvent::BucketCompleted {
                        worker_id: self.id,
                        bucket: &bucket,
                        pages,
                        records,
                    });
                }
                Err(error) => {
                    self.queue.cancel();
                    self.reporter.report(HarvestEvent::WorkerFailed {
                        worker_id: self.id,
                        bucket: &bucket,
                        error: &error,
                    });
                    lifecycle.advance(WorkerState::Exited)?;
                    return Err(error);
                }
            }
        }

        lifecycle.advance(WorkerState::Exited)?;
        self.reporter.report(HarvestEvent::WorkerStopped {
            worker_id: self.id,
            cancelled: self.queue.is_cancelled(),
        });
        Ok(())
    }

    /// Walks one bucket to exhaustion, persisting each page before the next
    async fn harvest_bucket(
        &self,
        bucket: DateBucket,
        lifecycle: &mut WorkerLifecycle,
    ) -> Result<(u32, u64), HarvestError> {
        let mut walker = self.pager.pages(bucket);
        let mut records: u64 = 0;

        lifecycle.advance(WorkerState::Fetching)?;
        while let Some(page) = walker.next_page().await? {
            lifecycle.advance(WorkerState::Persisting)?;
            self.persister
                .persist(&page.bucket, page.page_index, &page.payload)
                .await?;
            self.totals.record_page();
            records += page.record_count as u64;

            if page.page_index % self.progress_every == 0 {
                self.reporter.report(HarvestEvent::PageProgress {
                    worker_id: self.id,
                    bucket: &bucket,
                    pages: page.page_index,
                    records,
                });
            }
            lifecycle.advance(WorkerState::Fetching)?;
        }
        lifecycle.advance(WorkerState::Idle)?;

        Ok((walker.pages_fetched(), records))
    }
}
