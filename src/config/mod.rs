//! Configuration module for Paste-Sift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use paste_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sift.toml")).unwrap();
//! println!("Writing matches to: {}", config.output.path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, OutputConfig, ScanConfig, SourceConfig, ID_PLACEHOLDER};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
