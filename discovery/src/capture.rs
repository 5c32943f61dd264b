//! Capture of validated operations into the artifact tree.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use dumptruck_core::{DumpConfig, DumpError, Invocation, OutputFormat, Result, ValidatedOperation};
use tracing::{debug, info};

use crate::materialize::DirectoryMaterializer;
use crate::runner::Runner;

/// What happened to one `(operation, format)` capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Output was written to this path.
    Written(PathBuf),
    /// The invocation exceeded its bound; nothing was written.
    TimedOut,
    /// The tool exited non-zero; nothing was written.
    Failed(Option<i32>),
}

impl CaptureOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// Runs `<tool> <service> <subcommand> --output <format>` and stores stdout.
pub struct CaptureEngine<R> {
    runner: R,
    tool: String,
    timeout: Duration,
    output_dir: PathBuf,
    materializer: DirectoryMaterializer,
}

impl<R: Runner> CaptureEngine<R> {
    pub fn new(runner: R, config: &DumpConfig) -> Self {
        Self {
            runner,
            tool: config.tool.clone(),
            timeout: config.timeout(),
            output_dir: config.output_dir.clone(),
            materializer: DirectoryMaterializer::new(config.cache_capacity),
        }
    }

    /// Captures one operation in one format.
    ///
    /// Timeouts and non-zero exits are reported in the outcome, never as
    /// errors. On success the artifact is overwritten unconditionally.
    ///
    /// # Errors
    ///
    /// Directory materialization and write failures, and failures to start
    /// the tool at all, are returned as errors.
    pub fn capture(
        &self,
        op: &ValidatedOperation,
        format: &OutputFormat,
    ) -> Result<CaptureOutcome> {
        let invocation = Invocation::new(
            [
                self.tool.as_str(),
                op.service.as_str(),
                op.subcommand.as_str(),
                "--output",
                format.name.as_str(),
            ],
            self.timeout,
        )?;

        let outcome = self
            .runner
            .run(&invocation)
            .and_then(|execution| execution.into_success(&invocation));
        let execution = match outcome {
            Ok(execution) => execution,
            Err(DumpError::Timeout { .. }) => {
                debug!(command = %invocation, "capture timed out, skipping");
                return Ok(CaptureOutcome::TimedOut);
            }
            Err(DumpError::NonZeroExit { code, .. }) => {
                debug!(command = %invocation, code = ?code, "capture failed, skipping");
                return Ok(CaptureOutcome::Failed(code));
            }
            Err(e) => return Err(e),
        };

        self.materializer
            .ensure_dir(&op.artifact_dir(&self.output_dir, format))?;
        let path = op.artifact_path(&self.output_dir, format);
        fs::write(&path, &execution.stdout)?;
        info!(path = %path.display(), bytes = execution.stdout.len(), "wrote");
        Ok(CaptureOutcome::Written(path))
    }
}
