//! Content-addressed artifact files.
//!
//! Each group keeps exactly one artifact in its directory, named
//! `[name-]<fingerprint>.<ext>`. New artifacts are written under their final
//! name before the previous one is retired, so a crash never leaves a
//! half-written file behind under a valid name.

use std::path::PathBuf;

use kiln_common::{GroupId, OutputKind};
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::error::LedgerError;

/// Reads and writes artifact files in group directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactStore;

impl ArtifactStore {
    /// Creates an artifact store.
    pub fn new() -> Self {
        Self
    }

    /// Returns the path of an artifact within a group's directory.
    pub fn artifact_path(&self, group: &GroupId, filename: &str) -> PathBuf {
        group.directory().join(filename)
    }

    /// Returns `true` if the artifact file exists.
    pub fn exists(&self, group: &GroupId, filename: &str) -> bool {
        self.artifact_path(group, filename).is_file()
    }

    /// Writes an artifact, creating the group directory if needed.
    pub fn write(&self, group: &GroupId, filename: &str, data: &[u8]) -> Result<PathBuf, LedgerError> {
        let dir = group.directory();
        std::fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;

        let path = self.artifact_path(group, filename);
        write_atomic(&path, data).map_err(|e| LedgerError::io(&path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "wrote artifact");
        Ok(path)
    }

    /// Deletes a previous artifact. Returns `false` if it was already gone.
    pub fn retire(&self, group: &GroupId, filename: &str) -> Result<bool, LedgerError> {
        let path = self.artifact_path(group, filename);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "retired artifact");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LedgerError::io(path, e)),
        }
    }

    /// Removes leftover artifacts of this group other than `live`.
    ///
    /// Only files matching the group's exact naming pattern are considered:
    /// the group prefix, 32 lowercase hex digits, and the kind's extension.
    /// Returns the number of files removed.
    pub fn sweep(&self, group: &GroupId, kind: OutputKind, live: &str) -> Result<usize, LedgerError> {
        let dir = group.directory();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(LedgerError::io(dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| LedgerError::io(dir, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == live || !group.is_artifact_filename(&name, kind) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            std::fs::remove_file(&path).map_err(|e| LedgerError::io(&path, e))?;
            warn!(path = %path.display(), "removed stale artifact");
            removed += 1;
        }

        Ok(removed)
    }
}
