//! Core types for cloud account introspection dumps.
//!
//! This crate defines the shared vocabulary of the dumptruck workspace:
//!
//! - [`Invocation`] / [`ExecutionResult`]: one external command line and
//!   what it produced.
//! - [`ServiceName`], [`SubcommandName`], [`Candidate`] and
//!   [`ValidatedOperation`]: names read from help text, before and after
//!   validation.
//! - [`OutputFormat`]: an encoding passed to `--output` plus the file
//!   extension its captures are stored under.
//! - [`DumpConfig`]: run settings, loadable from YAML.
//! - [`DumpError`]: the error taxonomy shared by every crate.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use dumptruck_core::*;
//!
//! let config = DumpConfig::default();
//! let op = ValidatedOperation {
//!     service: ServiceName::new("iam").unwrap(),
//!     subcommand: SubcommandName::new("list-users").unwrap(),
//! };
//! let json = &config.formats[2];
//! assert_eq!(
//!     op.artifact_path(Path::new("out"), json),
//!     Path::new("out/json/iam/list-users.json")
//! );
//! ```

mod config;
mod error;
mod types;

pub use config::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_COMMANDS_MARKER, DEFAULT_OUTPUT_DIR,
    DEFAULT_SERVICES_MARKER, DEFAULT_TIMEOUT_SECS, DEFAULT_TOOL, DumpConfig,
};
pub use error::{DumpError, Result};
pub use types::*;
