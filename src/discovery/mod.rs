//! Discovery of candidate paste ids
//!
//! The pipeline only needs an ordered list of ids; where it comes from is
//! behind [`IdentifierSource`]. The production source scrapes the archive page.

mod archive;

pub use archive::{parse_archive_ids, ArchiveSource, PASTE_ID_LEN};

use crate::SiftError;
use std::collections::HashSet;
use std::future::Future;

/// Produces the ids a run should fetch
pub trait IdentifierSource: Send + Sync {
    /// Returns at most `max_count` recent ids, deduplicated, in listing order
    ///
    /// Transport and parse problems are returned as errors; the caller treats
    /// them as fatal to the run.
    fn list_recent_identifiers(
        &self,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<String>, SiftError>> + Send;
}

/// A fixed list of ids, for replaying a known set of pastes
///
/// Repeated ids are dropped before the cap is applied, like the archive does.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    ids: Vec<String>,
}

impl StaticSource {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl IdentifierSource for StaticSource {
    async fn list_recent_identifiers(&self, max_count: usize) -> Result<Vec<String>, SiftError> {
        let mut seen = HashSet::new();
        Ok(self
            .ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .take(max_count)
            .cloned()
            .collect())
    }
}
