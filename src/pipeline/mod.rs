//! Fetch pipeline
//!
//! This module contains the concurrent fetch/scan/write core, including:
//! - Global rate limiting across all units of work
//! - Round-robin proxy rotation
//! - Bounded-time HTTP fetching with per-item failure isolation
//! - Keyword scanning
//! - Overall run orchestration

mod coordinator;
mod fetcher;
mod proxy;
mod rate_limiter;
mod scanner;

pub use coordinator::{dedupe_ids, Orchestrator};
pub use fetcher::{build_http_client, fetch_url, FetchOutcome, HttpFetcher, PasteFetcher};
pub use proxy::ProxyRotator;
pub use rate_limiter::RateLimiter;
pub use scanner::scan;

use crate::config::Config;
use crate::discovery::ArchiveSource;
use crate::output::RunSummary;
use crate::SiftError;

/// Runs a complete harvest against the configured archive
///
/// This is the main entry point. It will:
/// 1. List recent paste ids from the archive page
/// 2. Recreate the output file
/// 3. Fetch and scan every paste under the configured limits
/// 4. Append a record for every paste with a keyword hit
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every paste reached a terminal state
/// * `Err(SiftError)` - Discovery or the output file failed
pub async fn harvest(config: Config) -> Result<RunSummary, SiftError> {
    let source = ArchiveSource::new(&config.fetch, &config.source)?;
    let fetcher = HttpFetcher::new(&config.fetch, &config.source)?;
    Orchestrator::new(config, source, fetcher).run().await
}
