//! Loading source files into ordered, kind-tagged fragments.

use std::path::{Path, PathBuf};

use kiln_common::{Fingerprint, FragmentKind};
use tracing::debug;

use crate::error::BuildError;

/// One unit of source content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// What the content is, decided by the source extension.
    pub kind: FragmentKind,
    /// The raw bytes.
    pub content: Vec<u8>,
    /// Path the content was read from; the first file of a joined run.
    pub origin: PathBuf,
}

impl Fragment {
    /// Creates a fragment.
    pub fn new(kind: FragmentKind, content: impl Into<Vec<u8>>, origin: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            content: content.into(),
            origin: origin.into(),
        }
    }

    /// Fingerprint of the fragment's content.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.content)
    }
}

/// The ordered fragments of one build request.
#[derive(Debug, Clone, Default)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
}

impl FragmentStore {
    /// Reads every path fully into memory, in order.
    ///
    /// Fails with [`BuildError::NoInput`] before touching the filesystem if
    /// `paths` is empty, with [`BuildError::UnsupportedKind`] for unknown
    /// extensions, and with [`BuildError::Read`] naming the first unreadable
    /// path.
    pub fn load(paths: &[PathBuf]) -> Result<Self, BuildError> {
        if paths.is_empty() {
            return Err(BuildError::NoInput);
        }

        let mut fragments = Vec::with_capacity(paths.len());
        for path in paths {
            let kind = kind_of(path)?;
            let content = std::fs::read(path).map_err(|e| BuildError::Read {
                path: path.clone(),
                source: e,
            })?;
            debug!(path = %path.display(), %kind, bytes = content.len(), "loaded fragment");
            fragments.push(Fragment::new(kind, content, path.clone()));
        }
        Ok(Self { fragments })
    }

    /// The fragments in input order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Consumes the store, returning the fragments in input order.
    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }
}

/// Tags a path with the fragment kind of its extension.
fn kind_of(path: &Path) -> Result<FragmentKind, BuildError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    FragmentKind::from_extension(extension).ok_or_else(|| BuildError::UnsupportedKind {
        path: path.to_path_buf(),
        extension: extension.to_string(),
    })
}
