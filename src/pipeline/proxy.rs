//! Round-robin proxy selection

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out egress proxies in round-robin order
///
/// An empty pool is its own variant so the fetch path never has to
/// special-case a missing list: it just receives `None` (connect directly).
#[derive(Debug)]
pub enum ProxyRotator {
    /// No proxies configured, every request goes direct
    Empty,

    /// Fixed pool cycled with a shared cursor
    RoundRobin {
        pool: Vec<String>,
        cursor: AtomicUsize,
    },
}

impl ProxyRotator {
    /// Builds a rotator from a (possibly empty) list of proxy URIs
    pub fn from_pool(pool: Vec<String>) -> Self {
        if pool.is_empty() {
            Self::Empty
        } else {
            Self::RoundRobin {
                pool,
                cursor: AtomicUsize::new(0),
            }
        }
    }

    /// Returns the next proxy, or `None` to connect directly
    ///
    /// Each call advances the cursor exactly once, so concurrent callers
    /// each get a distinct call index.
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::RoundRobin { pool, cursor } => {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                Some(pool[index % pool.len()].as_str())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::RoundRobin { pool, .. } => pool.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
