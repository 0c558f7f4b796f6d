//! The generation ledger abstraction and its implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use kiln_common::{GroupId, OutputKind};
use tracing::debug;

use crate::atomic::write_atomic;
use crate::error::LedgerError;
use crate::record::LedgerRecord;

/// Persisted comparison state, keyed by group identity and output kind.
///
/// Builds receive a ledger explicitly rather than reaching for global state.
/// Implementations must be safe to share between builds of different groups;
/// builds of the same group must be serialized by the caller.
pub trait Ledger: Send + Sync {
    /// Loads the previous record, or `None` if the group has never been built.
    fn load(&self, group: &GroupId, kind: OutputKind) -> Result<Option<LedgerRecord>, LedgerError>;

    /// Stores a new record, replacing any previous one.
    fn store(&self, group: &GroupId, kind: OutputKind, record: &LedgerRecord)
        -> Result<(), LedgerError>;

    /// Removes the previous record. Removing an absent record is not an error.
    fn clear_previous(&self, group: &GroupId, kind: OutputKind) -> Result<(), LedgerError>;
}

/// Ledger stored as `asset-info-*` files inside each group's directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLedger;

impl FileLedger {
    /// Creates a file-backed ledger.
    pub fn new() -> Self {
        Self
    }
}

impl Ledger for FileLedger {
    fn load(&self, group: &GroupId, kind: OutputKind) -> Result<Option<LedgerRecord>, LedgerError> {
        let path = group.ledger_path(kind);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger record");
                return Ok(None);
            }
            Err(e) => return Err(LedgerError::io(path, e)),
        };
        let text = String::from_utf8(raw).map_err(|_| LedgerError::Corrupt {
            path: path.clone(),
            reason: "not valid UTF-8".to_string(),
        })?;
        let record = LedgerRecord::parse(&path, &text)?;
        if let Some(record) = &record {
            // Later builds delete the recorded file, so it must be one of ours.
            if !group.is_artifact_filename(&record.output_filename, kind) {
                return Err(LedgerError::Corrupt {
                    path,
                    reason: format!(
                        "'{}' is not an artifact name of this group",
                        record.output_filename
                    ),
                });
            }
        }
        Ok(record)
    }

    fn store(
        &self,
        group: &GroupId,
        kind: OutputKind,
        record: &LedgerRecord,
    ) -> Result<(), LedgerError> {
        let dir = group.directory();
        std::fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;
        let path = group.ledger_path(kind);
        write_atomic(&path, record.render().as_bytes()).map_err(|e| LedgerError::io(&path, e))?;
        debug!(path = %path.display(), artifact = %record.output_filename, "stored ledger record");
        Ok(())
    }

    fn clear_previous(&self, group: &GroupId, kind: OutputKind) -> Result<(), LedgerError> {
        let path = group.ledger_path(kind);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::io(path, e)),
        }
    }
}

/// In-memory ledger, for embedders that keep state elsewhere and for tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<(GroupId, OutputKind), LedgerRecord>>,
}

impl MemoryLedger {
    /// Creates an empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(GroupId, OutputKind), LedgerRecord>> {
        // A panic while holding the lock cannot leave a map half-updated.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Ledger for MemoryLedger {
    fn load(&self, group: &GroupId, kind: OutputKind) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.lock().get(&(group.clone(), kind)).cloned())
    }

    fn store(
        &self,
        group: &GroupId,
        kind: OutputKind,
        record: &LedgerRecord,
    ) -> Result<(), LedgerError> {
        self.lock().insert((group.clone(), kind), record.clone());
        Ok(())
    }

    fn clear_previous(&self, group: &GroupId, kind: OutputKind) -> Result<(), LedgerError> {
        self.lock().remove(&(group.clone(), kind));
        Ok(())
    }
}
