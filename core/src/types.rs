//! Data model for discovery and capture.
//!
//! Names coming out of help text are wrapped in [`ServiceName`] and
//! [`SubcommandName`] so that emptiness is rejected once, at the boundary.
//! A [`Candidate`] is a name awaiting validation; a [`ValidatedOperation`] is
//! what capture consumes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DumpError, Result};

/// Prefixes of subcommands that are worth capturing.
pub const DUMP_PREFIXES: &[&str] = &["list-", "describe-"];

/// One external command line plus its time bound.
///
/// Identity is the argument vector alone: two invocations that differ only in
/// timeout compare equal and hash identically, which is what the memo cache
/// keys on.
#[derive(Debug, Clone)]
pub struct Invocation {
    args: Vec<String>,
    timeout: Duration,
}

impl Invocation {
    /// Builds an invocation. The first argument is the program.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::MalformedPrecondition`] when `args` is empty or the
    /// program name is blank.
    pub fn new<I, S>(args: I, timeout: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match args.first() {
            Some(program) if !program.trim().is_empty() => Ok(Self { args, timeout }),
            _ => Err(DumpError::MalformedPrecondition(
                "invocation needs a program name".to_string(),
            )),
        }
    }

    pub fn program(&self) -> &str {
        &self.args[0]
    }

    /// Arguments after the program name.
    pub fn tail(&self) -> &[String] {
        &self.args[1..]
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl PartialEq for Invocation {
    fn eq(&self, other: &Self) -> bool {
        self.args == other.args
    }
}

impl Eq for Invocation {}

impl Hash for Invocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.args.hash(state);
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Exit status and captured standard output of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
}

impl ExecutionResult {
    pub fn new(code: Option<i32>, stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Passes a zero-exit result through and turns anything else into
    /// [`DumpError::NonZeroExit`] for `invocation`.
    pub fn into_success(self, invocation: &Invocation) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(DumpError::NonZeroExit {
                command: invocation.to_string(),
                code: self.code,
            })
        }
    }
}

/// A top-level operation group of the external tool (e.g. `ec2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// # Errors
    ///
    /// Returns [`DumpError::MalformedPrecondition`] for names that are blank
    /// or would not stay a single path segment under the output directory.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        path_segment(name.into(), "service").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An operation within a service (e.g. `describe-instances`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubcommandName(String);

impl SubcommandName {
    /// # Errors
    ///
    /// Same rules as [`ServiceName::new`].
    pub fn new(name: impl Into<String>) -> Result<Self> {
        path_segment(name.into(), "subcommand").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `list-*` and `describe-*` subcommands.
    ///
    /// ```
    /// use dumptruck_core::SubcommandName;
    ///
    /// assert!(SubcommandName::new("list-buckets").unwrap().is_dump_candidate());
    /// assert!(!SubcommandName::new("delete-bucket").unwrap().is_dump_candidate());
    /// ```
    pub fn is_dump_candidate(&self) -> bool {
        DUMP_PREFIXES.iter().any(|prefix| self.0.starts_with(prefix))
    }
}

impl fmt::Display for SubcommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Names become directory and file names in the artifact tree.
fn path_segment(name: String, kind: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(DumpError::MalformedPrecondition(format!(
            "{kind} name cannot be empty"
        )));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(DumpError::MalformedPrecondition(format!(
            "{kind} name is not a single path segment: {name:?}"
        )));
    }
    Ok(name)
}

/// A name read from help text that has not been validated yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Candidate {
    Service(ServiceName),
    Operation(ServiceName, SubcommandName),
}

impl Candidate {
    /// Arguments (after the tool name) that address this candidate.
    pub fn path(&self) -> Vec<&str> {
        match self {
            Self::Service(service) => vec![service.as_str()],
            Self::Operation(service, subcommand) => vec![service.as_str(), subcommand.as_str()],
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path().join(" "))
    }
}

/// A `(service, subcommand)` pair that passed every validation probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidatedOperation {
    pub service: ServiceName,
    pub subcommand: SubcommandName,
}

impl ValidatedOperation {
    /// Directory that holds this operation's artifacts for one format:
    /// `<output_dir>/<format>/<service>`.
    pub fn artifact_dir(&self, output_dir: &Path, format: &OutputFormat) -> PathBuf {
        output_dir.join(&format.name).join(self.service.as_str())
    }

    /// Full artifact path: `<output_dir>/<format>/<service>/<subcommand>.<extension>`.
    ///
    /// ```
    /// use std::path::Path;
    /// use dumptruck_core::{OutputFormat, ServiceName, SubcommandName, ValidatedOperation};
    ///
    /// let op = ValidatedOperation {
    ///     service: ServiceName::new("s3api").unwrap(),
    ///     subcommand: SubcommandName::new("list-buckets").unwrap(),
    /// };
    /// let format = OutputFormat::new("json", "json");
    /// assert_eq!(
    ///     op.artifact_path(Path::new("/tmp/x"), &format),
    ///     Path::new("/tmp/x/json/s3api/list-buckets.json")
    /// );
    /// ```
    pub fn artifact_path(&self, output_dir: &Path, format: &OutputFormat) -> PathBuf {
        self.artifact_dir(output_dir, format)
            .join(format!("{}.{}", self.subcommand, format.extension))
    }
}

impl fmt::Display for ValidatedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.service, self.subcommand)
    }
}

/// An output encoding understood by the external tool and the file
/// extension its captures are stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct OutputFormat {
    /// Value passed to `--output`; also the top-level directory name.
    pub name: String,
    pub extension: String,
}

impl OutputFormat {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
        }
    }

    /// The fixed mapping `text→log`, `table→txt`, `json→json`, in that order.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("text", "log"),
            Self::new("table", "txt"),
            Self::new("json", "json"),
        ]
    }
}
