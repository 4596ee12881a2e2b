//! Run lifecycle states
//!
//! A run moves strictly forward: `Init -> Discovering -> FetchingAll -> Drained`.
//! There is no way back and no skipping ahead.

use std::fmt;

/// Represents the phase a harvesting run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Configuration loaded, nothing requested yet
    Init,

    /// Listing recent paste ids from the archive
    Discovering,

    /// Fetch/scan/write units are in flight
    FetchingAll,

    /// Every unit has completed and shared handles are closed
    Drained,
}

impl RunState {
    /// Returns the only state reachable from this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Discovering),
            Self::Discovering => Some(Self::FetchingAll),
            Self::FetchingAll => Some(Self::Drained),
            Self::Drained => None,
        }
    }

    /// Returns true if moving to `to` is a legal transition
    pub fn can_transition_to(&self, to: RunState) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Discovering => "discovering",
            Self::FetchingAll => "fetching_all",
            Self::Drained => "drained",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final state of a single fetch/scan/write unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Fetched and scanned, no keyword found
    Checked,

    /// Fetched, scanned, and a record was written
    Matched,

    /// Fetch failed (timeout, connection, proxy, HTTP status, decoding)
    Failed,

    /// Unit was cancelled before completing (session timeout or fatal sink error)
    Aborted,
}
