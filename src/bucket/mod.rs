//! Date bucketing for Food-Event-Harvester
//!
//! This module converts between `YYYYMMDD` strings and calendar dates and
//! splits an overall date range into one bucket per calendar month.

mod date;

use crate::HarvestError;
use chrono::NaiveDate;
use std::fmt;

// Re-export date helpers
pub use date::{format_ymd, last_day_of_month, parse_ymd};

/// A contiguous, inclusive sub-range of the overall harvest range
///
/// Buckets are the unit of work handed to a single worker. They are
/// immutable once created and always satisfy `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateBucket {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateBucket {
    /// Creates a bucket, rejecting ranges whose start is after their end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, HarvestError> {
        if start > end {
            return Err(HarvestError::InvalidRange {
                start: format_ymd(start),
                end: format_ymd(end),
            });
        }

        Ok(Self { start, end })
    }

    /// First day covered by this bucket
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day covered by this bucket (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start date as `YYYYMMDD`
    pub fn start_ymd(&self) -> String {
        format_ymd(self.start)
    }

    /// End date as `YYYYMMDD`
    pub fn end_ymd(&self) -> String {
        format_ymd(self.end)
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_ymd(), self.end_ymd())
    }
}

/// Splits `[start, end]` into one bucket per calendar month
///
/// The first and last buckets are clipped to the overall range. The returned
/// buckets are chronological, contiguous, non-overlapping, and together cover
/// every day of the range exactly once.
///
/// # Arguments
///
/// * `start` - First day of the overall range
/// * `end` - Last day of the overall range (inclusive)
///
/// # Returns
///
/// * `Ok(Vec<DateBucket>)` - At least one bucket
/// * `Err(HarvestError::InvalidRange)` - `start` is after `end`
///
/// # Examples
///
/// ```
/// use food_event_harvester::{parse_ymd, partition};
///
/// let buckets = partition(parse_ymd("20000101").unwrap(), parse_ymd("20000215").unwrap()).unwrap();
/// assert_eq!(buckets.len(), 2);
/// assert_eq!(buckets[0].to_string(), "20000101..20000131");
/// assert_eq!(buckets[1].to_string(), "20000201..20000215");
/// ```
pub fn partition(start: NaiveDate, end: NaiveDate) -> Result<Vec<DateBucket>, HarvestError> {
    if start > end {
        return Err(HarvestError::InvalidRange {
            start: format_ymd(start),
            end: format_ymd(end),
        });
    }

    let mut buckets = Vec::new();
    let mut current = start;

    loop {
        let month_end = last_day_of_month(current).min(end);
        buckets.push(DateBucket {
            start: current,
            end: month_end,
        });

        match month_end.succ_opt() {
            Some(next) if next <= end => current = next,
            _ => break,
        }
    }

    Ok(buckets)
}
