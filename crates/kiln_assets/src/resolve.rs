//! Expanding source patterns into concrete file lists.

use std::path::{Path, PathBuf};

/// Errors from expanding a source pattern.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The pattern is not valid glob syntax.
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Description of the syntax problem.
        reason: String,
    },

    /// A directory could not be read while matching.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Expands one source pattern into an ordered list of paths.
pub trait PathResolver: Send + Sync {
    /// Returns the paths matching `pattern`, in a deterministic order.
    ///
    /// A pattern that matches nothing yields an empty list, not an error.
    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>, ResolveError>;
}

/// Resolves shell-style glob patterns relative to a base directory.
///
/// Matches for one pattern come back sorted by path; a pattern without
/// wildcards resolves to itself if the file exists.
#[derive(Debug, Clone, Default)]
pub struct GlobResolver {
    base: PathBuf,
}

impl GlobResolver {
    /// Creates a resolver that interprets relative patterns against `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn anchored(&self, pattern: &str) -> Result<String, ResolveError> {
        if Path::new(pattern).is_absolute() || self.base.as_os_str().is_empty() {
            return Ok(pattern.to_string());
        }
        let base = self.base.to_str().ok_or_else(|| ResolveError::Pattern {
            pattern: pattern.to_string(),
            reason: format!("base directory {} is not valid UTF-8", self.base.display()),
        })?;
        let anchored = PathBuf::from(glob::Pattern::escape(base)).join(pattern);
        Ok(anchored.to_string_lossy().into_owned())
    }
}

impl PathResolver for GlobResolver {
    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
        let anchored = self.anchored(pattern)?;
        let paths = glob::glob(&anchored).map_err(|e| ResolveError::Pattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;

        let mut matches = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| ResolveError::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_file() {
                matches.push(path);
            }
        }
        Ok(matches)
    }
}
