//! Global request pacing
//!
//! Every unit of work calls [`RateLimiter::wait`] before touching the network.
//! The limiter hands out start slots spaced at least `min_interval` apart,
//! across all callers.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between successive outbound requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two releases
    min_interval: Duration,

    /// Release time handed to the most recent caller
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `min_interval` - Minimum time between two `wait()` returns
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_release: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until this caller may issue a request
    ///
    /// The slot is reserved under the lock and the sleep happens after the
    /// lock is released, so concurrent callers queue up one interval apart
    /// instead of all observing the same stale timestamp.
    pub async fn wait(&self) {
        let release_at = self.reserve_slot(Instant::now());
        tokio::time::sleep_until(release_at).await;
    }

    /// Reserves the next release slot at or after `now`
    fn reserve_slot(&self, now: Instant) -> Instant {
        let mut last = self
            .last_release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let release_at = match *last {
            Some(prev) => std::cmp::max(now, prev + self.min_interval),
            None => now,
        };
        *last = Some(release_at);

        tracing::trace!(
            "Rate limiter slot reserved {:?} from now",
            release_at.saturating_duration_since(now)
        );

        release_at
    }
}
