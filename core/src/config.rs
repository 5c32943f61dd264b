//! Run configuration for discovery and capture.
//!
//! Every field has a default, so a YAML file only needs the values it
//! overrides.
//!
//! # Example YAML
//!
//! ```yaml
//! tool: aws
//! output_dir: ./dumptruck
//! timeout_secs: 300
//! formats:
//!   - { name: text, extension: log }
//!   - { name: table, extension: txt }
//!   - { name: json, extension: json }
//! cache_capacity: 4096
//! jobs: 1
//! services: [ec2, iam]
//! ```

use std::collections::HashSet;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DumpError, Result};
use crate::types::OutputFormat;

/// Program invoked when no tool is configured.
pub const DEFAULT_TOOL: &str = "aws";

/// Root of the artifact tree when no output directory is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "./dumptruck";

/// Per-invocation bound in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Distinct entries each memo cache keeps before evicting the least
/// recently used one.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Services section heading in root help, after overstrike backspaces are
/// stripped from the bold `SERVICES` title.
pub const DEFAULT_SERVICES_MARKER: &str = "SSEERRVVIICCEESS";

/// Commands section heading in per-service help, stripped the same way.
pub const DEFAULT_COMMANDS_MARKER: &str = "CCOOMMMMAANNDDSS";

/// Settings for one discovery and capture run.
///
/// # Examples
///
/// ```
/// use dumptruck_core::DumpConfig;
///
/// let config: DumpConfig = serde_yaml::from_str("timeout_secs: 30").unwrap();
/// assert_eq!(config.tool, "aws");
/// assert_eq!(config.timeout().as_secs(), 30);
/// assert_eq!(config.formats.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// External tool program name or path.
    pub tool: String,
    /// Root of the artifact tree.
    pub output_dir: PathBuf,
    /// Bound applied to every external invocation.
    pub timeout_secs: u64,
    /// Formats captured per operation, in capture order.
    pub formats: Vec<OutputFormat>,
    pub services_marker: String,
    pub commands_marker: String,
    /// Capacity of each memo cache.
    pub cache_capacity: usize,
    /// Capture parallelism. `1` keeps the run strictly sequential.
    pub jobs: usize,
    /// Services to dump; empty means every discovered service.
    pub services: Vec<String>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            formats: OutputFormat::defaults(),
            services_marker: DEFAULT_SERVICES_MARKER.to_string(),
            commands_marker: DEFAULT_COMMANDS_MARKER.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            jobs: 1,
            services: Vec::new(),
        }
    }
}

impl DumpConfig {
    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](DumpError::Io) if the file cannot be read,
    /// [`Yaml`](DumpError::Yaml) if parsing fails, or
    /// [`Config`](DumpError::Config) if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns `true` if `service` should be dumped under the allowlist.
    pub fn is_service_selected(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s == service)
    }

    /// Rejects values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(DumpError::Config("tool cannot be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(DumpError::Config("output_dir cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(DumpError::Config("timeout_secs must be positive".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(DumpError::Config("cache_capacity must be positive".to_string()));
        }
        if self.jobs == 0 {
            return Err(DumpError::Config("jobs must be positive".to_string()));
        }
        if self.services_marker.is_empty() || self.commands_marker.is_empty() {
            return Err(DumpError::Config("section markers cannot be empty".to_string()));
        }
        if self.formats.is_empty() {
            return Err(DumpError::Config("at least one format is required".to_string()));
        }
        let mut seen = HashSet::new();
        for format in &self.formats {
            if format.name.trim().is_empty() || format.extension.trim().is_empty() {
                return Err(DumpError::Config(
                    "format name and extension cannot be empty".to_string(),
                ));
            }
            if format.name.contains(['/', '\\']) || format.name.starts_with('.') {
                return Err(DumpError::Config(format!(
                    "format name must be a plain directory name: {}",
                    format.name
                )));
            }
            if !seen.insert(format.name.as_str()) {
                return Err(DumpError::Config(format!(
                    "duplicate format: {}",
                    format.name
                )));
            }
        }
        Ok(())
    }
}
