//! Worker lifecycle states for the bucket pool
//!
//! A worker loops `Idle → Claimed → Fetching ⇄ Persisting → Idle` until the
//! bucket list is exhausted or the run is cancelled, then moves to `Exited`.

use crate::HarvestError;
use std::fmt;

/// Represents what a pool worker is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting to claim the next bucket
    Idle,

    /// Holds a bucket but has not issued a request yet
    Claimed,

    /// Awaiting a page from the fetcher (including backoff and pacing)
    Fetching,

    /// Writing the current page to the persister
    Persisting,

    /// No further buckets will be claimed
    Exited,
}

impl WorkerState {
    /// Returns true if the worker has stopped for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited)
    }

    /// Returns true while the worker owns a bucket
    pub fn holds_bucket(&self) -> bool {
        matches!(self, Self::Claimed | Self::Fetching | Self::Persisting)
    }

    /// Checks whether moving from `self` to `next` is a legal step
    ///
    /// Any live state may move to `Exited` so that a failing worker can stop
    /// wherever the error surfaced.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;

        match (self, next) {
            (Exited, _) => false,
            (_, Exited) => true,
            (Idle, Claimed) => true,
            (Claimed, Fetching) => true,
            (Fetching, Persisting) => true,
            (Fetching, Idle) => true,
            (Persisting, Fetching) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Claimed => "claimed",
            Self::Fetching => "fetching",
            Self::Persisting => "persisting",
            Self::Exited => "exited",
        }
    }

    /// Returns all possible worker states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Claimed,
            Self::Fetching,
            Self::Persisting,
            Self::Exited,
        ]
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one worker's current state and rejects illegal steps
#[derive(Debug)]
pub struct WorkerLifecycle {
    worker_id: usize,
    state: WorkerState,
}

impl WorkerLifecycle {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Moves to `next`, or fails with `HarvestError::InvalidTransition`
    pub fn advance(&mut self, next: WorkerState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!(
            worker = self.worker_id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Worker state change"
        );
        self.state = next;
        Ok(())
    }
}
