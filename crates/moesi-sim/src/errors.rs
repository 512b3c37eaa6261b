//! Error types for loading configurations and traces.

use std::io;
use std::path::PathBuf;

use moesi_core::ConfigError;
use thiserror::Error;

use crate::trace::TraceError;

/// Failures that stop a simulation before any operation runs.
#[derive(Debug, Error)]
pub enum SimError {
    /// A config or trace file could not be read.
    #[error("{}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A config file is not valid JSON for a system configuration.
    #[error("{}: invalid config: {source}", path.display())]
    Json {
        /// Config file path.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// The configuration describes an impossible cache system.
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    /// The trace file has a syntax error.
    #[error("{}: {source}", path.display())]
    Trace {
        /// Trace file path.
        path: PathBuf,
        /// Parse error with line number.
        source: TraceError,
    },
}

impl SimError {
    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        format!("error: {self}")
    }
}
