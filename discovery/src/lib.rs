//! Discovery and capture of read-only cloud introspection commands.
//!
//! This crate scrapes the help pages of a command-line cloud management tool
//! (`aws` by default) to find every `list-*` and `describe-*` operation,
//! confirms each one by trial execution, and stores its output in several
//! encodings under `<output_dir>/<format>/<service>/<subcommand>.<ext>`.
//!
//! # Main entry points
//!
//! - [`dump`]: the full sweep against any [`Runner`].
//! - [`dump_with_tool`]: the same against real child processes, memoized.
//! - [`discover::DiscoveryEngine`]: discovery on its own, as lazy iterators.
//! - [`scanner::scan`] and [`sanitize::sanitize`]: offline help parsing.
//!
//! # Example
//!
//! ```no_run
//! use dumptruck_core::DumpConfig;
//! use dumptruck_discovery::dump_with_tool;
//!
//! let config = DumpConfig::default();
//! dump_with_tool(&config).unwrap();
//! ```
//!
//! Timeouts and non-zero exits never abort a run; they only leave gaps in the
//! tree. Precondition, configuration and filesystem errors do.

pub mod cache;
pub mod capture;
pub mod discover;
pub mod materialize;
pub mod oracle;
pub mod runner;
pub mod sanitize;
pub mod scanner;

#[cfg(test)]
mod testing;

use dumptruck_core::{DumpConfig, DumpError, Result, ValidatedOperation};
use rayon::prelude::*;
use tracing::info;

use capture::{CaptureEngine, CaptureOutcome};
use discover::DiscoveryEngine;
pub use runner::{MemoizedRunner, ProcessRunner, Runner};

/// Counters for one completed sweep.
///
/// Nothing reports these; the artifact tree is the only record of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOutcome {
    /// Operations that passed every validation probe.
    pub operations: usize,
    /// Artifacts written.
    pub written: usize,
    /// Captures skipped after a timeout or non-zero exit.
    pub skipped: usize,
}

impl DumpOutcome {
    fn record(&mut self, outcome: &CaptureOutcome) {
        if outcome.is_written() {
            self.written += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Discovers every dumpable operation and captures it in each configured
/// format.
///
/// With `config.jobs == 1` discovery and capture interleave: each operation
/// is captured as soon as it validates. With more jobs, discovery finishes
/// first and the `(operation, format)` product is captured on a thread pool
/// of that size.
///
/// # Errors
///
/// Invalid configuration, an unreachable root help page, and directory or
/// write failures end the run.
pub fn dump<R: Runner>(runner: &R, config: &DumpConfig) -> Result<DumpOutcome> {
    config.validate()?;
    info!(
        tool = %config.tool,
        output_dir = %config.output_dir.display(),
        jobs = config.jobs,
        "starting dump"
    );

    let discovery = DiscoveryEngine::new(runner, config);
    let capture = CaptureEngine::new(runner, config);
    let mut outcome = DumpOutcome::default();

    if config.jobs == 1 {
        for op in discovery.list_valid_dump_commands()? {
            let op = op?;
            outcome.operations += 1;
            for format in &config.formats {
                outcome.record(&capture.capture(&op, format)?);
            }
        }
    } else {
        let ops: Vec<ValidatedOperation> = discovery
            .list_valid_dump_commands()?
            .collect::<Result<_>>()?;
        outcome.operations = ops.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|e| DumpError::Config(format!("failed to build thread pool: {e}")))?;
        let results: Vec<Result<CaptureOutcome>> = pool.install(|| {
            ops.par_iter()
                .flat_map_iter(|op| config.formats.iter().map(move |format| (op, format)))
                .map(|(op, format)| capture.capture(op, format))
                .collect()
        });
        for result in results {
            outcome.record(&result?);
        }
    }

    Ok(outcome)
}

/// Runs [`dump`] against real processes through a memoizing runner.
pub fn dump_with_tool(config: &DumpConfig) -> Result<DumpOutcome> {
    let runner = MemoizedRunner::new(ProcessRunner, config.cache_capacity);
    dump(&runner, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use crate::testing::{FakeTool, root_help, service_help};

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    out.extend(files_under(&path));
                } else {
                    out.push(path);
                }
            }
        }
        out.sort();
        out
    }

    fn alpha_tool() -> FakeTool {
        FakeTool::new()
            .ok(&["help"], &root_help(&["alpha"]))
            .ok(&["alpha", "help"], &service_help("alpha", &["list-items"]))
            .ok(&["alpha", "list-items"], "[]")
            .ok(&["alpha", "list-items", "--output", "json"], "[]")
    }

    #[test]
    fn test_single_service_scenario_writes_only_json() {
        let out = tempfile::tempdir().unwrap();
        let root = out.path().join("x");
        let tool = alpha_tool();
        let config = DumpConfig {
            output_dir: root.clone(),
            ..DumpConfig::default()
        };

        let outcome = dump(&tool, &config).unwrap();
        assert_eq!(
            outcome,
            DumpOutcome {
                operations: 1,
                written: 1,
                skipped: 2
            }
        );
        let artifact = root.join("json/alpha/list-items.json");
        assert_eq!(files_under(&root), vec![artifact.clone()]);
        assert_eq!(fs::read(&artifact).unwrap(), b"[]");
        assert!(!root.join("text").exists());
        assert!(!root.join("table").exists());
    }

    #[test]
    fn test_parallel_capture_produces_same_tree() {
        let tool = FakeTool::new()
            .ok(&["help"], &root_help(&["alpha", "beta"]))
            .ok(&["alpha", "help"], &service_help("alpha", &["list-items", "describe-item"]))
            .ok(&["beta", "help"], &service_help("beta", &["list-things"]))
            .ok(&["alpha", "list-items"], "")
            .ok(&["alpha", "describe-item"], "")
            .ok(&["beta", "list-things"], "")
            .ok(&["alpha", "list-items", "--output", "text"], "items")
            .ok(&["alpha", "list-items", "--output", "json"], "[]")
            .ok(&["alpha", "describe-item", "--output", "table"], "+--+")
            .ok(&["beta", "list-things", "--output", "json"], "{}");

        let sequential = tempfile::tempdir().unwrap();
        let parallel = tempfile::tempdir().unwrap();
        let seq_outcome = dump(
            &tool,
            &DumpConfig {
                output_dir: sequential.path().to_path_buf(),
                ..DumpConfig::default()
            },
        )
        .unwrap();
        let par_outcome = dump(
            &tool,
            &DumpConfig {
                output_dir: parallel.path().to_path_buf(),
                jobs: 4,
                ..DumpConfig::default()
            },
        )
        .unwrap();

        assert_eq!(seq_outcome, par_outcome);
        assert_eq!(seq_outcome.operations, 3);
        assert_eq!(seq_outcome.written, 4);
        let relative = |root: &Path| -> Vec<PathBuf> {
            files_under(root)
                .into_iter()
                .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
                .collect()
        };
        assert_eq!(relative(sequential.path()), relative(parallel.path()));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_any_probe() {
        let tool = alpha_tool();
        let config = DumpConfig {
            formats: Vec::new(),
            ..DumpConfig::default()
        };
        assert!(matches!(dump(&tool, &config), Err(DumpError::Config(_))));
        assert_eq!(tool.total_calls(), 0);
    }

    #[test]
    fn test_shared_memo_runner_probes_each_command_once() {
        let out = tempfile::tempdir().unwrap();
        let runner = MemoizedRunner::new(alpha_tool(), 64);
        let config = DumpConfig {
            output_dir: out.path().to_path_buf(),
            ..DumpConfig::default()
        };
        dump(&runner, &config).unwrap();
        dump(&runner, &config).unwrap();
        assert_eq!(runner.inner().calls_to(&["alpha", "list-items"]), 1);
        assert_eq!(runner.inner().calls_to(&["alpha", "list-items", "--output", "json"]), 1);
    }
}
