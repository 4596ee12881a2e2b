//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunState`: The orchestrator's lifecycle (init, discovering, fetching, drained)
//! - `ItemState`: How a single paste's unit of work ended

mod run_state;

// Re-export main types
pub use run_state::{ItemState, RunState};
