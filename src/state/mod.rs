//! State module for tracking worker progress
//!
//! This module provides the lifecycle state machine each pool worker walks
//! through while claiming, fetching, and persisting buckets.

mod worker_state;

// Re-export main types
pub use worker_state::{WorkerLifecycle, WorkerState};
