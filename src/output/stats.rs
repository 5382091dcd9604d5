//! Run totals shared between workers
//!
//! Workers add to a [`RunTotals`] as buckets finish; the scheduler reads a
//! [`RunSummary`] snapshot once the pool has drained.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Concurrency-safe accumulator for run-wide counts
///
/// All updates are additions, so the final totals do not depend on the
/// order in which workers finish.
#[derive(Debug, Default)]
pub struct RunTotals {
    buckets_completed: AtomicU64,
    pages_written: AtomicU64,
    total_records: AtomicU64,
}

impl RunTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single persisted page
    pub fn record_page(&self) {
        self.pages_written.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a finished bucket and the records it produced
    pub fn record_bucket(&self, records: u64) {
        self.buckets_completed.fetch_add(1, Ordering::SeqCst);
        self.total_records.fetch_add(records, Ordering::SeqCst);
    }

    pub fn buckets_completed(&self) -> u64 {
        self.buckets_completed.load(Ordering::SeqCst)
    }

    pub fn pages_written(&self) -> u64 {
        self.pages_written.load(Ordering::SeqCst)
    }

    pub fn total_records(&self) -> u64 {
        self.total_records.load(Ordering::SeqCst)
    }

    /// Takes a point-in-time snapshot for reporting
    pub fn snapshot(&self, buckets_total: usize, elapsed: Duration) -> RunSummary {
        RunSummary {
            buckets_total: buckets_total as u64,
            buckets_completed: self.buckets_completed(),
            pages_written: self.pages_written(),
            total_records: self.total_records(),
            elapsed,
        }
    }
}

/// Final report of a harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub buckets_total: u64,
    pub buckets_completed: u64,
    pub pages_written: u64,
    pub total_records: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns true if every bucket was walked to its last page
    pub fn is_complete(&self) -> bool {
        self.buckets_completed == self.buckets_total
    }
}

/// Prints the run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");
    println!(
        "  Buckets completed: {} / {}",
        summary.buckets_completed, summary.buckets_total
    );
    println!("  Pages written: {}", summary.pages_written);
    println!("  Total records: {}", summary.total_records);

    let secs = summary.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.pages_written as f64 / secs
    } else {
        0.0
    };
    println!("  Elapsed: {:.1}s ({:.2} pages/sec)", secs, rate);
}
