//! Error types for ledger and artifact operations.

use std::path::PathBuf;

/// Errors that can occur while reading or writing ledger records and artifacts.
///
/// A missing ledger file is not an error; it is reported as "no previous
/// record" so the first build of a group proceeds normally.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// An I/O error occurred while reading or writing a ledger or artifact file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A ledger file exists but is not well formed.
    #[error("corrupt ledger {path}: {reason}")]
    Corrupt {
        /// The ledger file path.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = LedgerError::io(
            "/tmp/static/asset-info-css",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("asset-info-css"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn corrupt_display() {
        let err = LedgerError::Corrupt {
            path: PathBuf::from("asset-info-js"),
            reason: "not valid UTF-8".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("corrupt ledger"));
        assert!(msg.contains("not valid UTF-8"));
    }
}
