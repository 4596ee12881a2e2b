//! Per-run statistics
//!
//! Tallies how each unit of work ended so the operator gets a one-line
//! trail of what the run did.

use crate::state::ItemState;
use std::fmt;

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ids returned by discovery, after dedupe and capping
    pub discovered: usize,

    /// Pastes fetched and scanned without a match
    pub checked: usize,

    /// Pastes that produced a record
    pub matched: usize,

    /// Pastes whose fetch failed
    pub failed: usize,

    /// Units cancelled before completion
    pub aborted: usize,

    /// Whether the session timeout cut the fetch phase short
    pub timed_out: bool,
}

impl RunSummary {
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    /// Records how one unit ended
    pub fn record(&mut self, state: ItemState) {
        match state {
            ItemState::Checked => self.checked += 1,
            ItemState::Matched => self.matched += 1,
            ItemState::Failed => self.failed += 1,
            ItemState::Aborted => self.aborted += 1,
        }
    }

    /// Number of pastes that were fetched and scanned
    pub fn scanned(&self) -> usize {
        self.checked + self.matched
    }

    /// Number of units that reached any terminal state
    pub fn completed(&self) -> usize {
        self.checked + self.matched + self.failed + self.aborted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discovered, {} scanned, {} matched, {} failed",
            self.discovered,
            self.scanned(),
            self.matched,
            self.failed
        )?;
        if self.aborted > 0 {
            write!(f, ", {} aborted", self.aborted)?;
        }
        if self.timed_out {
            write!(f, " (session timeout)")?;
        }
        Ok(())
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary, output_path: &str) {
    println!("=== Run Summary ===\n");
    println!("  Discovered: {}", summary.discovered);
    println!("  Scanned:    {}", summary.scanned());
    println!("  Matched:    {}", summary.matched);
    println!("  Failed:     {}", summary.failed);
    if summary.aborted > 0 {
        println!("  Aborted:    {}", summary.aborted);
    }
    if summary.timed_out {
        println!("  Session timeout reached before all pastes completed");
    }
    println!("\nMatches written to: {}", output_path);
}
