//! Group identity: the directory and base name an artifact group lives under.

use std::path::{Path, PathBuf};

use crate::fingerprint::Fingerprint;
use crate::kind::OutputKind;

/// Prefix shared by every ledger file.
const LEDGER_PREFIX: &str = "asset-info-";

/// Hex digits in a rendered fingerprint.
const FINGERPRINT_HEX_LEN: usize = 32;

/// Identifies one artifact group.
///
/// Two groups with different identities never share a ledger record or an
/// artifact file. The name may be empty, in which case filenames carry no
/// name prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId {
    /// Output directory for the artifact and its ledger record.
    pub directory: PathBuf,
    /// Base name used as the filename prefix.
    pub name: String,
}

impl GroupId {
    /// Creates a group identity.
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
        }
    }

    /// The output directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Filename prefix for artifacts: `"<name>-"`, or empty for unnamed groups.
    pub fn artifact_prefix(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!("{}-", self.name)
        }
    }

    /// Content-addressed artifact filename: `[name-]<fingerprint>.<ext>`.
    pub fn artifact_filename(&self, fingerprint: &Fingerprint, kind: OutputKind) -> String {
        format!(
            "{}{fingerprint}.{}",
            self.artifact_prefix(),
            kind.extension()
        )
    }

    /// Returns `true` if `filename` has the shape of one of this group's
    /// artifacts of the given kind: the prefix, 32 lowercase hex digits, and
    /// the extension.
    pub fn is_artifact_filename(&self, filename: &str, kind: OutputKind) -> bool {
        let prefix = self.artifact_prefix();
        let Some(rest) = filename.strip_prefix(prefix.as_str()) else {
            return false;
        };
        let Some(hex) = rest
            .strip_suffix(kind.extension())
            .and_then(|r| r.strip_suffix('.'))
        else {
            return false;
        };
        hex.len() == FINGERPRINT_HEX_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Ledger filename: `asset-info-<ext>` or `asset-info-<name>-<ext>`.
    pub fn ledger_filename(&self, kind: OutputKind) -> String {
        format!(
            "{LEDGER_PREFIX}{}{}",
            self.artifact_prefix(),
            kind.extension()
        )
    }

    /// Full path of the ledger file for the given output kind.
    pub fn ledger_path(&self, kind: OutputKind) -> PathBuf {
        self.directory.join(self.ledger_filename(kind))
    }
}
