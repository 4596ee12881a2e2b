//! Run orchestration
//!
//! This module drives one harvesting run through its lifecycle:
//! - Discovering candidate paste ids (once, failure is fatal)
//! - Fanning out one fetch/scan/write unit per id under a connection limit
//! - Joining every unit, whatever its outcome
//! - Closing the output and HTTP session

use crate::config::Config;
use crate::discovery::IdentifierSource;
use crate::output::{JsonlSink, MatchRecord, RunSummary};
use crate::pipeline::fetcher::{FetchOutcome, PasteFetcher};
use crate::pipeline::proxy::ProxyRotator;
use crate::pipeline::rate_limiter::RateLimiter;
use crate::pipeline::scanner::scan;
use crate::state::{ItemState, RunState};
use crate::SiftError;
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Shared handles every unit of work needs
struct UnitContext<F> {
    config: Arc<Config>,
    fetcher: Arc<F>,
    sink: Arc<JsonlSink>,
    limiter: Arc<RateLimiter>,
    rotator: Arc<ProxyRotator>,
    connections: Arc<Semaphore>,
}

impl<F> Clone for UnitContext<F> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            sink: self.sink.clone(),
            limiter: self.limiter.clone(),
            rotator: self.rotator.clone(),
            connections: self.connections.clone(),
        }
    }
}

/// Main run orchestrator
pub struct Orchestrator<S, F> {
    config: Arc<Config>,
    source: S,
    fetcher: Arc<F>,
    limiter: Arc<RateLimiter>,
    rotator: Arc<ProxyRotator>,
    connections: Arc<Semaphore>,
    state: RunState,
}

impl<S, F> Orchestrator<S, F>
where
    S: IdentifierSource,
    F: PasteFetcher,
{
    /// Creates a new orchestrator in the `Init` state
    ///
    /// # Arguments
    ///
    /// * `config` - The validated run configuration
    /// * `source` - Where candidate paste ids come from
    /// * `fetcher` - How a single paste body is retrieved
    pub fn new(config: Config, source: S, fetcher: F) -> Self {
        let limiter = RateLimiter::new(config.fetch.min_interval());
        let rotator = ProxyRotator::from_pool(config.fetch.proxies.clone());
        let connections = Semaphore::new(config.fetch.max_connections);

        Self {
            config: Arc::new(config),
            source,
            fetcher: Arc::new(fetcher),
            limiter: Arc::new(limiter),
            rotator: Arc::new(rotator),
            connections: Arc::new(connections),
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, to: RunState) -> Result<(), SiftError> {
        if !self.state.can_transition_to(to) {
            return Err(SiftError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("Run state {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Runs discovery, fetches every candidate, and drains
    ///
    /// Returns `Ok` once every unit has completed, regardless of how many
    /// individual fetches failed. Errors are limited to discovery failure,
    /// output file failure, and illegal state transitions.
    pub async fn run(mut self) -> Result<RunSummary, SiftError> {
        let max_pastes = self.config.fetch.max_pastes;

        self.transition(RunState::Discovering)?;
        let discovered = self.source.list_recent_identifiers(max_pastes).await?;
        let ids = dedupe_ids(discovered, max_pastes);

        self.transition(RunState::FetchingAll)?;
        let sink = Arc::new(JsonlSink::create(Path::new(&self.config.output.path))?);
        tracing::info!("Writing matches to {}", sink.path().display());
        if self.rotator.is_empty() {
            tracing::info!(
                "Fetching {} pastes ({} at a time, {:?} apart, direct)",
                ids.len(),
                self.config.fetch.max_connections,
                self.limiter.min_interval()
            );
        } else {
            tracing::info!(
                "Fetching {} pastes ({} at a time, {:?} apart, {} proxies)",
                ids.len(),
                self.config.fetch.max_connections,
                self.limiter.min_interval(),
                self.rotator.len()
            );
        }

        let mut summary = RunSummary::new(ids.len());
        let fetched = self.fetch_all(ids, sink.clone(), &mut summary).await;

        self.transition(RunState::Drained)?;
        let closed = sink.close();
        let Self { fetcher, .. } = self;
        drop(fetcher);
        tracing::debug!("HTTP session closed");

        fetched?;
        closed?;

        tracing::info!("Run complete: {}", summary);
        Ok(summary)
    }

    /// Spawns one unit per id and joins all of them
    async fn fetch_all(
        &self,
        ids: Vec<String>,
        sink: Arc<JsonlSink>,
        summary: &mut RunSummary,
    ) -> Result<(), SiftError> {
        let ctx = UnitContext {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            sink,
            limiter: self.limiter.clone(),
            rotator: self.rotator.clone(),
            connections: self.connections.clone(),
        };

        let mut units = JoinSet::new();
        for id in ids {
            units.spawn(process_paste(ctx.clone(), id));
        }
        drop(ctx);

        let session_limit = self.config.fetch.session_deadline(units.len());
        let deadline = tokio::time::sleep(session_limit);
        tokio::pin!(deadline);

        let mut fatal: Option<SiftError> = None;
        loop {
            tokio::select! {
                joined = units.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(state))) => summary.record(state),
                    Some(Ok(Err(e))) => {
                        tracing::error!("Output failure, cancelling remaining pastes: {}", e);
                        summary.record(ItemState::Aborted);
                        units.abort_all();
                        fatal.get_or_insert(e);
                    }
                    Some(Err(e)) if e.is_cancelled() => summary.record(ItemState::Aborted),
                    Some(Err(e)) => {
                        tracing::error!("Paste task panicked: {}", e);
                        summary.record(ItemState::Failed);
                    }
                },
                _ = &mut deadline, if !summary.timed_out => {
                    tracing::warn!(
                        "Session timeout of {:?} reached, cancelling {} unfinished pastes",
                        session_limit,
                        units.len()
                    );
                    summary.timed_out = true;
                    units.abort_all();
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// One unit of work: wait, pick proxy, fetch, scan, maybe write
///
/// Fetch problems end the unit as `Failed` and never reach the caller as an
/// error. Only a sink failure is returned as `Err`.
async fn process_paste<F: PasteFetcher>(
    ctx: UnitContext<F>,
    id: String,
) -> Result<ItemState, SiftError> {
    let outcome = {
        // Held for the duration of the request only
        let _permit = match ctx.connections.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Ok(ItemState::Aborted),
        };
        ctx.limiter.wait().await;
        let proxy = ctx.rotator.next();
        tracing::debug!("[{}] fetching via {}", id, proxy.unwrap_or("direct"));
        ctx.fetcher.fetch(&id, proxy).await
    };

    let body = match outcome {
        FetchOutcome::Success { body } => body,
        FetchOutcome::Failure { reason } => {
            tracing::warn!("[{}] fetch error: {}", id, reason);
            return Ok(ItemState::Failed);
        }
    };

    let found = scan(&body, &ctx.config.scan.keywords);
    tracing::info!("[{}] checked, found keywords: {:?}", id, found);

    let url = ctx.config.source.raw_url(&id);
    match MatchRecord::build(&ctx.config.source.name, &id, &url, found, Utc::now()) {
        None => Ok(ItemState::Checked),
        Some(record) => {
            ctx.sink.append(&record)?;
            tracing::info!("[{}] MATCH written", id);
            Ok(ItemState::Matched)
        }
    }
}

/// Drops repeated ids (first occurrence wins) and caps the list
pub fn dedupe_ids(ids: Vec<String>, max_count: usize) -> Vec<String> {
    let total = ids.len();
    let mut seen = HashSet::new();
    let unique: Vec<String> = ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .take(max_count)
        .collect();

    if unique.len() < total {
        tracing::debug!(
            "Dropped {} duplicate or excess ids",
            total - unique.len()
        );
    }
    unique
}
