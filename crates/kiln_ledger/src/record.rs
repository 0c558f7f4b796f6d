//! The ledger record and its line-oriented on-disk format.
//!
//! Line 1 holds the last artifact filename; every following line holds one
//! fragment fingerprint, in fragment order. Lines are separated by `\n` and no
//! trailing newline is written. Other tooling reads this format, so it must
//! stay line-oriented.

use std::path::Path;

use kiln_common::Fingerprint;

use crate::error::LedgerError;

/// What the previous successful build of a group produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Filename of the artifact the build wrote, relative to the group directory.
    pub output_filename: String,

    /// Per-fragment fingerprints, post-join and pre-transform, in order.
    pub fingerprints: Vec<String>,
}

impl LedgerRecord {
    /// Creates a record for a freshly written artifact.
    pub fn new(output_filename: impl Into<String>, fingerprints: &[Fingerprint]) -> Self {
        Self {
            output_filename: output_filename.into(),
            fingerprints: fingerprints.iter().map(ToString::to_string).collect(),
        }
    }

    /// Parses ledger file content.
    ///
    /// Returns `Ok(None)` when the content has fewer than two lines; such a
    /// record cannot describe any build and is treated like a missing ledger.
    /// `path` is used for error reporting only.
    pub fn parse(path: &Path, text: &str) -> Result<Option<Self>, LedgerError> {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

        let Some(output_filename) = lines.next() else {
            return Ok(None);
        };
        let fingerprints: Vec<String> = lines.map(str::to_string).collect();
        if fingerprints.is_empty() {
            return Ok(None);
        }

        if output_filename.is_empty() {
            return Err(LedgerError::Corrupt {
                path: path.to_path_buf(),
                reason: "empty artifact filename".to_string(),
            });
        }
        if output_filename.contains(['/', '\\']) || output_filename == ".." {
            return Err(LedgerError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("artifact filename '{output_filename}' is not a plain filename"),
            });
        }

        Ok(Some(Self {
            output_filename: output_filename.to_string(),
            fingerprints,
        }))
    }

    /// Renders the record in the on-disk format.
    pub fn render(&self) -> String {
        let mut out = self.output_filename.clone();
        for fp in &self.fingerprints {
            out.push('\n');
            out.push_str(fp);
        }
        out
    }

    /// Decides whether the current fragments differ from the previous build.
    ///
    /// Changed when there is no previous record, the fragment count differs,
    /// or any fingerprint differs at the same position. Reordering identical
    /// fragments counts as a change.
    pub fn has_changed(previous: Option<&Self>, current: &[Fingerprint]) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        if previous.fingerprints.len() != current.len() {
            return true;
        }
        previous
            .fingerprints
            .iter()
            .zip(current)
            .any(|(old, new)| *old != new.to_string())
    }
}
