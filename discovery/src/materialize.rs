//! Idempotent creation of artifact directories.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dumptruck_core::{DumpError, Result};
use tracing::debug;

use crate::cache::MemoCache;

/// Creates directory paths one prefix at a time.
///
/// Paths already materialized by this instance are remembered and not checked
/// against the filesystem again, so a directory removed by someone else after
/// the first call is not recreated.
pub struct DirectoryMaterializer {
    done: MemoCache<PathBuf, ()>,
}

impl DirectoryMaterializer {
    pub fn new(capacity: usize) -> Self {
        Self {
            done: MemoCache::new(capacity),
        }
    }

    /// Ensures `path` and every ancestor on it exist as directories.
    ///
    /// # Errors
    ///
    /// - [`DumpError::MalformedPrecondition`] for an empty path.
    /// - [`DumpError::NotADirectory`] if a prefix exists as something else.
    /// - [`DumpError::Io`] if creating a prefix fails.
    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(DumpError::MalformedPrecondition(
                "directory path cannot be empty".to_string(),
            ));
        }
        let key = path.to_path_buf();
        if self.done.contains(&key) {
            return Ok(());
        }
        debug!(path = %path.display(), "mkdir");

        let mut prefix = PathBuf::new();
        for component in path.components() {
            prefix.push(component);
            ensure_single_dir(&prefix)?;
        }
        self.done.insert(key, ());
        Ok(())
    }
}

fn ensure_single_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DumpError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => match fs::create_dir(path) {
            Ok(()) => Ok(()),
            // Another capture worker won the race.
            Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}
