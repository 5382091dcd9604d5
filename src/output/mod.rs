//! Output module for persisting pages and reporting run totals
//!
//! This module handles:
//! - Writing each fetched page to a deterministically named file
//! - Accumulating run-wide counts across workers
//! - Printing the final harvest summary

mod files;
pub mod stats;
mod traits;

pub use files::FilePersister;
pub use stats::{print_summary, RunSummary, RunTotals};
pub use traits::{artifact_name, OutputError, OutputResult, PagePersister};
