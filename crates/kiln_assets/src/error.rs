//! Error types for asset group builds.

use std::path::PathBuf;

use kiln_common::{FragmentKind, OutputKind};
use kiln_ledger::LedgerError;

use crate::resolve::ResolveError;
use crate::tool::ToolError;

/// Errors that abort a build.
///
/// Every error is returned to the caller as-is; nothing is retried. Errors
/// raised before the artifact is written leave the previous artifact and
/// ledger record untouched.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The source patterns resolved to zero files.
    #[error("no input files given")]
    NoInput,

    /// A source pattern is not a valid glob.
    #[error("invalid source pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Description of the syntax problem.
        reason: String,
    },

    /// A source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A source file has an extension with no known fragment kind.
    #[error("unsupported extension \"{extension}\" on {path}")]
    UnsupportedKind {
        /// The source path.
        path: PathBuf,
        /// The extension, without the dot (empty if there was none).
        extension: String,
    },

    /// Style and script fragments were mixed in one group.
    #[error("can't mix css and js in one asset: {origin} is {found}, group is {expected}")]
    MixedKind {
        /// The group's output kind, taken from its first fragment.
        expected: OutputKind,
        /// The kind the offending fragment compiled to.
        found: OutputKind,
        /// Source path of the offending fragment.
        origin: PathBuf,
    },

    /// An external source-language compiler failed.
    #[error("{kind} transform of {origin} failed: {source}")]
    Transform {
        /// The source-language kind being compiled.
        kind: FragmentKind,
        /// Source path of the fragment (first file of a joined run).
        origin: PathBuf,
        /// The tool failure.
        source: ToolError,
    },

    /// The external compressor failed.
    #[error("{kind} compression failed: {source}")]
    Compress {
        /// The artifact kind being compressed.
        kind: OutputKind,
        /// The tool failure.
        source: ToolError,
    },

    /// The ledger could not be read or updated.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The output directory or artifact file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The path being written or removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl BuildError {
    /// Converts an artifact store failure into a write error.
    pub(crate) fn artifact(err: LedgerError) -> Self {
        match err {
            LedgerError::Io { path, source } => Self::Write { path, source },
            other => Self::Ledger(other),
        }
    }
}

impl From<ResolveError> for BuildError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Pattern { pattern, reason } => Self::Pattern { pattern, reason },
            ResolveError::Io { path, source } => Self::Read { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_input_display() {
        assert_eq!(BuildError::NoInput.to_string(), "no input files given");
    }

    #[test]
    fn unsupported_kind_display() {
        let err = BuildError::UnsupportedKind {
            path: PathBuf::from("assets/app.ts"),
            extension: "ts".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported extension \"ts\" on assets/app.ts"
        );
    }

    #[test]
    fn mixed_kind_display() {
        let err = BuildError::MixedKind {
            expected: OutputKind::Style,
            found: OutputKind::Script,
            origin: PathBuf::from("b.js"),
        };
        let msg = err.to_string();
        assert!(msg.contains("can't mix css and js"));
        assert!(msg.contains("b.js is js"));
    }

    #[test]
    fn transform_display_keeps_tool_diagnostics() {
        let err = BuildError::Transform {
            kind: FragmentKind::SourceStyleLang,
            origin: PathBuf::from("b.less"),
            source: ToolError::Diagnostics {
                program: "lessc".to_string(),
                stderr: "ParseError: Unrecognised input".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("less transform of b.less failed"));
        assert!(msg.contains("Unrecognised input"));
    }

    #[test]
    fn artifact_io_becomes_write_error() {
        let err = BuildError::artifact(LedgerError::Io {
            path: PathBuf::from("static/app.css"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(matches!(err, BuildError::Write { .. }));
    }

    #[test]
    fn resolve_errors_convert() {
        let err: BuildError = ResolveError::Pattern {
            pattern: "[".to_string(),
            reason: "invalid range pattern".to_string(),
        }
        .into();
        assert!(matches!(err, BuildError::Pattern { .. }));
    }
}
