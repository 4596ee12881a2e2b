//! JSON Lines result sink
//!
//! One file per run, opened once, shared by every unit of work, closed once.

use crate::output::record::MatchRecord;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while writing match records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink for {0} is already closed")]
    Closed(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only, line-delimited JSON output shared across concurrent writers
///
/// Each record is serialized outside the lock and written with a single
/// `write_all` while holding it, so lines from different units never
/// interleave.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
    written: AtomicU64,
}

impl JsonlSink {
    /// Creates a fresh output file at `path`
    ///
    /// Any file left by a previous run is removed first. Missing parent
    /// directories are created.
    pub fn create(path: &Path) -> OutputResult<Self> {
        let io_err = |source| OutputError::Io {
            path: path.display().to_string(),
            source,
        };

        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed previous output {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
            written: AtomicU64::new(0),
        })
    }

    /// Appends one record as a complete line
    pub fn append(&self, record: &MatchRecord) -> OutputResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = guard
            .as_mut()
            .ok_or_else(|| OutputError::Closed(self.path.display().to_string()))?;

        file.write_all(line.as_bytes())
            .map_err(|source| OutputError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Flushes and releases the file handle
    ///
    /// Calling it again is a no-op.
    pub fn close(&self) -> OutputResult<()> {
        let taken = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(mut file) = taken {
            file.flush()
                .and_then(|_| file.sync_all())
                .map_err(|source| OutputError::Io {
                    path: self.path.display().to_string(),
                    source,
                })?;
            tracing::debug!(
                "Closed {} after {} records",
                self.path.display(),
                self.records_written()
            );
        }

        Ok(())
    }

    /// Number of records successfully appended so far
    pub fn records_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
