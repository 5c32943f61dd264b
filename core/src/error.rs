//! Error types for discovery and capture runs.
//!
//! Failures fall into two groups. Transient ones ([`DumpError::Timeout`] and
//! [`DumpError::NonZeroExit`]) mean "no data for this operation" and are
//! absorbed by the layer that observes them. Everything else indicates a
//! broken environment or a caller bug and terminates the run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while discovering or capturing operations.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The external tool did not finish within its bound.
    #[error("command timed out after {timeout:?}: {command}")]
    Timeout {
        /// Rendered command line.
        command: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// The external tool exited with a non-zero (or no) status code.
    #[error("command exited with status {code:?}: {command}")]
    NonZeroExit {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },

    /// The external tool could not be started at all.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A caller contract was violated (empty path, unvalidated service, ...).
    #[error("precondition violated: {0}")]
    MalformedPrecondition(String),

    /// A path segment exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    Config(String),

    /// YAML parsing failure while loading a config file.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`DumpError`].
pub type Result<T> = std::result::Result<T, DumpError>;
