//! Paste-Sift: a keyword watcher for public paste sites
//!
//! This crate harvests recently published pastes, scans each body for a
//! configured keyword set, and appends matches to a newline-delimited JSON
//! file for later triage.

pub mod config;
pub mod discovery;
pub mod output;
pub mod pipeline;
pub mod state;

use thiserror::Error;

/// Main error type for Paste-Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery failed for {url}: {message}")]
    Discovery { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Result sink error: {0}")]
    Sink(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Paste-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use output::{JsonlSink, MatchRecord, RunSummary};
pub use pipeline::{FetchOutcome, Orchestrator};
pub use state::RunState;
