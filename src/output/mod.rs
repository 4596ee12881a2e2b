//! Output module for match records and run summaries
//!
//! This module handles:
//! - The `MatchRecord` written for every paste with at least one keyword hit
//! - The shared JSON Lines sink those records are appended to
//! - Per-run statistics

mod jsonl;
mod record;
pub mod stats;

pub use jsonl::{JsonlSink, OutputError, OutputResult};
pub use record::{MatchRecord, STATUS_PENDING, TIMESTAMP_FORMAT};
pub use stats::{print_summary, RunSummary};
