//! Bounded execution of the external tool.
//!
//! [`ProcessRunner`] spawns the command, drains its stdout on a helper thread
//! and waits with a timeout; stderr is discarded. [`MemoizedRunner`] wraps any
//! [`Runner`] and reuses finished results keyed on the argument vector alone.
//!
//! The timeout is not part of the memo key: a result recorded under one bound
//! is returned for a later call with a different bound. That is sound only
//! because every command run here is a read-only introspection call.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use dumptruck_core::{DumpError, ExecutionResult, Invocation, Result};
use tracing::{debug, trace};
use wait_timeout::ChildExt;

use crate::cache::MemoCache;

/// Executes invocations of the external tool.
///
/// Implementations return `Ok` for any process that ran to completion,
/// whatever its exit code, and [`DumpError::Timeout`] when the bound expires.
pub trait Runner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        (**self).run(invocation)
    }
}

impl<R: Runner + ?Sized> Runner for Arc<R> {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        (**self).run(invocation)
    }
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        debug!(command = %invocation, "running command");
        let started = Instant::now();
        let mut child = Command::new(invocation.program())
            .args(invocation.tail())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DumpError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        // Drain stdout in the background so a full pipe buffer cannot stall
        // the child before it exits.
        let (tx, rx) = mpsc::channel();
        if let Some(mut pipe) = child.stdout.take() {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let result = pipe.read_to_end(&mut buf);
                let _ = tx.send((buf, result));
            });
        }

        let status = match child.wait_timeout(invocation.timeout()) {
            Ok(Some(status)) => status,
            Ok(None) => {
                debug!(
                    command = %invocation,
                    timeout = ?invocation.timeout(),
                    "command timed out, killing process"
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out(invocation));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DumpError::Io(e));
            }
        };

        // Descendants may keep the pipe open after the child exits; the
        // remaining budget bounds the wait for end of stream.
        let remaining = invocation.timeout().saturating_sub(started.elapsed());
        let stdout = match rx.recv_timeout(remaining) {
            Ok((buf, Ok(_))) => buf,
            Ok((buf, Err(e))) => {
                debug!(command = %invocation, error = %e, "failed to read stdout");
                buf
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!(command = %invocation, "stdout still open after exit, giving up");
                return Err(timed_out(invocation));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DumpError::Io(std::io::Error::other(
                    "stdout reader exited without a result",
                )));
            }
        };

        Ok(ExecutionResult::new(status.code(), stdout))
    }
}

fn timed_out(invocation: &Invocation) -> DumpError {
    DumpError::Timeout {
        command: invocation.to_string(),
        timeout: invocation.timeout(),
    }
}

/// Reuses finished results of identical argument vectors.
///
/// Only completed executions are stored; timeouts and spawn failures are
/// returned to the caller and retried on the next identical call.
pub struct MemoizedRunner<R> {
    inner: R,
    cache: MemoCache<Invocation, ExecutionResult>,
}

impl<R: Runner> MemoizedRunner<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            cache: MemoCache::new(capacity),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of distinct invocations currently remembered.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<R: Runner> Runner for MemoizedRunner<R> {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        self.cache.get_or_try_insert_with(invocation, || {
            trace!(command = %invocation, "memo cache miss");
            self.inner.run(invocation)
        })
    }
}
