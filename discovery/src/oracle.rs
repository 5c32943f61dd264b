//! Validation probes for candidate names.
//!
//! Help text lists names that are not always usable, so every candidate is
//! confirmed by running something. A name is valid when its help document can
//! be fetched without error; an operation is runnable when invoking it with no
//! parameters exits zero. Probe output is only kept when it is a help
//! document that discovery needs to scan.

use std::sync::Arc;
use std::time::Duration;

use dumptruck_core::{
    Candidate, DumpConfig, Invocation, Result, ServiceName, SubcommandName,
};
use tracing::debug;

use crate::cache::MemoCache;
use crate::runner::Runner;
use crate::sanitize::sanitize;

/// Sanitized lines of one help document.
pub type HelpDoc = Arc<[String]>;

/// Runs and memoizes validation probes against the external tool.
pub struct ValidationOracle<R> {
    runner: R,
    tool: String,
    timeout: Duration,
    docs: MemoCache<Vec<String>, HelpDoc>,
    validity: MemoCache<Vec<String>, bool>,
}

impl<R: Runner> ValidationOracle<R> {
    pub fn new(runner: R, config: &DumpConfig) -> Self {
        Self {
            runner,
            tool: config.tool.clone(),
            timeout: config.timeout(),
            docs: MemoCache::new(config.cache_capacity),
            validity: MemoCache::new(config.cache_capacity),
        }
    }

    /// Builds `<tool> <args...>` under the configured timeout.
    pub fn invocation(&self, args: &[&str]) -> Result<Invocation> {
        let argv = std::iter::once(self.tool.as_str()).chain(args.iter().copied());
        Invocation::new(argv, self.timeout)
    }

    /// Fetches `<tool> <path...> help` as sanitized lines.
    ///
    /// The exit status is not inspected; only a failure to run at all (spawn
    /// error, timeout) is an error. Successful documents are memoized per path.
    pub fn help_doc(&self, path: &[&str]) -> Result<HelpDoc> {
        let key: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        self.docs.get_or_try_insert_with(&key, || {
            let mut args = path.to_vec();
            args.push("help");
            let invocation = self.invocation(&args)?;
            let execution = self.runner.run(&invocation)?;
            Ok(sanitize(&execution.stdout).collect::<Vec<_>>().into())
        })
    }

    /// Help text of the tool itself.
    pub fn root_help(&self) -> Result<HelpDoc> {
        self.help_doc(&[])
    }

    /// Returns `true` if the candidate's help document can be fetched.
    pub fn is_valid(&self, candidate: &Candidate) -> bool {
        let path = candidate.path();
        let key: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        if let Some(valid) = self.validity.get(&key) {
            return valid;
        }
        let valid = match self.help_doc(&path) {
            Ok(_) => true,
            Err(e) => {
                debug!(candidate = %candidate, error = %e, "help probe failed");
                false
            }
        };
        self.validity.insert(key, valid);
        valid
    }

    pub fn service_is_valid(&self, service: &ServiceName) -> bool {
        self.is_valid(&Candidate::Service(service.clone()))
    }

    pub fn subcommand_is_valid(&self, service: &ServiceName, subcommand: &SubcommandName) -> bool {
        self.is_valid(&Candidate::Operation(service.clone(), subcommand.clone()))
    }

    /// Returns `true` iff `<tool> <args...>` exits zero; output is ignored.
    pub fn operation_is_runnable(&self, args: &[&str]) -> bool {
        let outcome = self.invocation(args).and_then(|invocation| {
            self.runner.run(&invocation)?.into_success(&invocation)
        });
        match outcome {
            Ok(_) => true,
            Err(e) => {
                debug!(args = ?args, error = %e, "operation probe failed");
                false
            }
        }
    }
}
