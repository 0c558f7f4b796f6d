//! The artifact builder: change detection and the artifact lifecycle.
//!
//! A build walks these stages in order:
//!
//! 1. expand source patterns and load fragments;
//! 2. take the output kind from the first fragment;
//! 3. join adjacent source-language fragments (unless disabled);
//! 4. fingerprint each fragment and compare against the ledger.
//!
//! If nothing changed, the recorded filename is returned and nothing is
//! written. Otherwise fragments are compiled, checked for a uniform kind,
//! concatenated, optionally compressed, and named by the fingerprint of the
//! final bytes. The new artifact is written first; only then are the previous
//! ledger record and artifact cleared and the new record stored. Every fallible
//! step that does not touch the output directory runs before the first write.
//!
//! Builds of different groups may run concurrently. Builds of the same group
//! must be serialized by the caller.

use std::path::{Path, PathBuf};

use kiln_common::{Fingerprint, GroupId, OutputKind};
use kiln_ledger::{ArtifactStore, FileLedger, Ledger, LedgerRecord};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::error::BuildError;
use crate::fragment::{Fragment, FragmentStore};
use crate::join::join_adjacent;
use crate::resolve::{GlobResolver, PathResolver};
use crate::tool::Toolchain;

/// Shared collaborators for building asset groups.
pub struct AssetPipeline {
    resolver: Box<dyn PathResolver>,
    toolchain: Toolchain,
    ledger: Box<dyn Ledger>,
    artifacts: ArtifactStore,
}

impl AssetPipeline {
    /// Creates a pipeline with glob patterns resolved against the current
    /// directory and ledger records kept next to the artifacts.
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            resolver: Box::new(GlobResolver::default()),
            toolchain,
            ledger: Box::new(FileLedger::new()),
            artifacts: ArtifactStore::new(),
        }
    }

    /// Replaces the path resolver.
    pub fn with_resolver(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replaces the ledger.
    pub fn with_ledger(mut self, ledger: impl Ledger + 'static) -> Self {
        self.ledger = Box::new(ledger);
        self
    }

    /// Starts a group from source patterns. Nothing is read until a build.
    pub fn group<I, S>(&self, patterns: I) -> AssetGroup<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AssetGroup {
            pipeline: self,
            patterns: patterns.into_iter().map(Into::into).collect(),
            compress: true,
            join: true,
        }
    }
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("toolchain", &self.toolchain)
            .finish_non_exhaustive()
    }
}

/// An ordered list of source patterns that builds into one artifact.
///
/// Order of sources is preserved in the output. A group produces either a
/// `.css` or a `.js` file; mixing the two is an error.
#[derive(Debug)]
pub struct AssetGroup<'p> {
    pipeline: &'p AssetPipeline,
    patterns: Vec<String>,
    compress: bool,
    join: bool,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Artifact filename, relative to the group directory.
    pub filename: String,
    /// Kind of the artifact.
    pub kind: OutputKind,
    /// `false` if the previous artifact was reused without writing anything.
    pub rebuilt: bool,
    /// Number of fragments after joining.
    pub fragments: usize,
}

/// Whether a group's artifact is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    /// The recorded artifact matches the current sources.
    UpToDate {
        /// The recorded artifact filename.
        filename: String,
    },
    /// A build would regenerate the artifact.
    Stale {
        /// The previously recorded artifact, if any.
        previous: Option<String>,
    },
}

/// Fragments and ledger state gathered before deciding to rebuild.
struct Prepared {
    kind: OutputKind,
    fragments: Vec<Fragment>,
    fingerprints: Vec<Fingerprint>,
    previous: Option<LedgerRecord>,
    changed: bool,
}

impl<'p> AssetGroup<'p> {
    /// Appends more source patterns.
    pub fn add_sources<I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Enables or disables compression of the final artifact. Enabled by default.
    pub fn set_compress(&mut self, compress: bool) -> &mut Self {
        self.compress = compress;
        self
    }

    /// Enables or disables joining adjacent source-language fragments before
    /// compilation. Enabled by default.
    ///
    /// With joining on, sources `a.coffee, b.js, c.coffee, d.coffee` compile
    /// as three units: `a`, `b`, and `c+d`.
    pub fn set_join(&mut self, join: bool) -> &mut Self {
        self.join = join;
        self
    }

    /// The source patterns, in order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Builds the group into `directory` and returns the artifact filename.
    ///
    /// Repeated calls with unchanged sources return the same filename without
    /// writing anything.
    pub fn build(&self, directory: impl AsRef<Path>, name: &str) -> Result<String, BuildError> {
        self.build_report(directory, name).map(|r| r.filename)
    }

    /// Like [`build`](Self::build), but also reports whether anything was
    /// regenerated.
    pub fn build_report(
        &self,
        directory: impl AsRef<Path>,
        name: &str,
    ) -> Result<BuildReport, BuildError> {
        let group = GroupId::new(directory.as_ref(), name);
        let _span = info_span!(
            "build",
            dir = %group.directory.display(),
            group = %group.name
        )
        .entered();

        let prepared = self.prepare(&group)?;
        if !prepared.changed {
            if let Some(previous) = &prepared.previous {
                debug!(artifact = %previous.output_filename, "sources unchanged");
                return Ok(BuildReport {
                    filename: previous.output_filename.clone(),
                    kind: prepared.kind,
                    rebuilt: false,
                    fragments: prepared.fragments.len(),
                });
            }
        }
        self.regenerate(&group, prepared)
    }

    /// Reports whether a build would regenerate the artifact. Never writes.
    pub fn status(&self, directory: impl AsRef<Path>, name: &str) -> Result<GroupStatus, BuildError> {
        let group = GroupId::new(directory.as_ref(), name);
        let prepared = self.prepare(&group)?;
        let previous = prepared.previous.map(|r| r.output_filename);
        Ok(match (prepared.changed, previous) {
            (false, Some(filename)) => GroupStatus::UpToDate { filename },
            (_, previous) => GroupStatus::Stale { previous },
        })
    }

    /// Runs every stage up to and including change detection.
    fn prepare(&self, group: &GroupId) -> Result<Prepared, BuildError> {
        let paths = self.expand()?;
        let fragments = FragmentStore::load(&paths)?.into_fragments();
        let kind = fragments
            .first()
            .map(|f| f.kind.output_kind())
            .ok_or(BuildError::NoInput)?;

        let fragments = if self.join {
            join_adjacent(&fragments)
        } else {
            fragments
        };
        let fingerprints: Vec<Fingerprint> = fragments.iter().map(Fragment::fingerprint).collect();

        let previous = self.pipeline.ledger.load(group, kind)?;
        let mut changed = LedgerRecord::has_changed(previous.as_ref(), &fingerprints);
        if let (false, Some(previous)) = (changed, &previous) {
            if !self.pipeline.artifacts.exists(group, &previous.output_filename) {
                debug!(artifact = %previous.output_filename, "recorded artifact is missing");
                changed = true;
            }
        }

        Ok(Prepared {
            kind,
            fragments,
            fingerprints,
            previous,
            changed,
        })
    }

    fn expand(&self) -> Result<Vec<PathBuf>, BuildError> {
        let mut paths = Vec::new();
        for pattern in &self.patterns {
            paths.extend(self.pipeline.resolver.expand(pattern)?);
        }
        debug!(patterns = self.patterns.len(), files = paths.len(), "expanded sources");
        Ok(paths)
    }

    /// Compiles, names, writes, and records a new artifact.
    fn regenerate(&self, group: &GroupId, prepared: Prepared) -> Result<BuildReport, BuildError> {
        let Prepared {
            kind,
            fragments,
            fingerprints,
            previous,
            ..
        } = prepared;
        let count = fragments.len();

        let compiled = self.compile(fragments)?;
        verify_kind(kind, &compiled)?;

        let mut bytes: Vec<u8> = compiled.into_iter().flat_map(|f| f.content).collect();
        if self.compress {
            bytes = self
                .pipeline
                .toolchain
                .compressor()
                .compress(&bytes, kind)
                .map_err(|source| BuildError::Compress { kind, source })?;
        }

        let filename = group.artifact_filename(&Fingerprint::of(&bytes), kind);
        let artifacts = &self.pipeline.artifacts;
        let ledger = &self.pipeline.ledger;

        artifacts
            .write(group, &filename, &bytes)
            .map_err(BuildError::artifact)?;

        ledger.clear_previous(group, kind)?;
        if let Some(previous) = previous.as_ref() {
            if previous.output_filename != filename {
                artifacts
                    .retire(group, &previous.output_filename)
                    .map_err(BuildError::artifact)?;
            }
        }
        artifacts
            .sweep(group, kind, &filename)
            .map_err(BuildError::artifact)?;
        ledger.store(group, kind, &LedgerRecord::new(filename.as_str(), &fingerprints))?;

        info!(artifact = %filename, bytes = bytes.len(), fragments = count, "built asset");
        Ok(BuildReport {
            filename,
            kind,
            rebuilt: true,
            fragments: count,
        })
    }

    /// Runs each source-language fragment through its compiler.
    fn compile(&self, fragments: Vec<Fragment>) -> Result<Vec<Fragment>, BuildError> {
        fragments
            .into_iter()
            .map(|fragment| -> Result<Fragment, BuildError> {
                if !fragment.kind.is_joinable() {
                    return Ok(fragment);
                }
                let transform = self
                    .pipeline
                    .toolchain
                    .transform_for(fragment.kind.output_kind());
                let content = transform.transform(&fragment.content).map_err(|source| {
                    BuildError::Transform {
                        kind: fragment.kind,
                        origin: fragment.origin.clone(),
                        source,
                    }
                })?;
                debug!(origin = %fragment.origin.display(), kind = %fragment.kind, "compiled fragment");
                Ok(Fragment::new(fragment.kind.compiled(), content, fragment.origin))
            })
            .collect()
    }
}

/// Checks that every compiled fragment belongs to the group's output kind.
fn verify_kind(expected: OutputKind, fragments: &[Fragment]) -> Result<(), BuildError> {
    match fragments
        .iter()
        .find(|f| f.kind.output_kind() != expected || f.kind.is_joinable())
    {
        Some(f) => Err(BuildError::MixedKind {
            expected,
            found: f.kind.output_kind(),
            origin: f.origin.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::FragmentKind;
    use kiln_ledger::MemoryLedger;

    fn identity(input: &[u8]) -> Result<Vec<u8>, crate::tool::ToolError> {
        Ok(input.to_vec())
    }

    fn no_compress(input: &[u8], _: OutputKind) -> Result<Vec<u8>, crate::tool::ToolError> {
        Ok(input.to_vec())
    }

    fn pipeline(base: &Path) -> AssetPipeline {
        AssetPipeline::new(Toolchain::new(identity, identity, no_compress))
            .with_resolver(GlobResolver::new(base))
            .with_ledger(MemoryLedger::new())
    }

    #[test]
    fn verify_kind_accepts_uniform() {
        let fragments = [
            Fragment::new(FragmentKind::RawStyle, "a", "a.css"),
            Fragment::new(FragmentKind::CompiledStyle, "b", "b.less"),
        ];
        assert!(verify_kind(OutputKind::Style, &fragments).is_ok());
    }

    #[test]
    fn verify_kind_rejects_mix() {
        let fragments = [
            Fragment::new(FragmentKind::RawStyle, "a", "a.css"),
            Fragment::new(FragmentKind::RawScript, "b", "b.js"),
        ];
        match verify_kind(OutputKind::Style, &fragments).unwrap_err() {
            BuildError::MixedKind { found, origin, .. } => {
                assert_eq!(found, OutputKind::Script);
                assert_eq!(origin, PathBuf::from("b.js"));
            }
            other => panic!("expected MixedKind, got {other:?}"),
        }
    }

    #[test]
    fn group_defaults_and_setters() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut group = pipeline.group(["a.css"]);
        assert!(group.compress && group.join);
        group
            .add_sources(["b.less", "c.less"])
            .set_compress(false)
            .set_join(false);
        assert_eq!(group.patterns(), ["a.css", "b.less", "c.less"]);
        assert!(!group.compress && !group.join);
    }

    #[test]
    fn status_reports_stale_then_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.css"), "a{}").unwrap();
        let out = dir.path().join("static");
        let pipeline = pipeline(dir.path());
        let group = pipeline.group(["a.css"]);

        assert_eq!(
            group.status(&out, "app").unwrap(),
            GroupStatus::Stale { previous: None }
        );
        assert!(!out.exists(), "status must not write");

        let filename = group.build(&out, "app").unwrap();
        assert_eq!(
            group.status(&out, "app").unwrap(),
            GroupStatus::UpToDate { filename }
        );
    }

    #[test]
    fn report_marks_reuse() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "var a;").unwrap();
        let out = dir.path().join("static");
        let pipeline = pipeline(dir.path());
        let group = pipeline.group(["a.js"]);

        let first = group.build_report(&out, "").unwrap();
        assert!(first.rebuilt);
        assert_eq!(first.kind, OutputKind::Script);
        let second = group.build_report(&out, "").unwrap();
        assert!(!second.rebuilt);
        assert_eq!(second.filename, first.filename);
    }

    #[test]
    fn missing_artifact_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.css"), "a{}").unwrap();
        let out = dir.path().join("static");
        let pipeline = pipeline(dir.path());
        let group = pipeline.group(["a.css"]);

        let filename = group.build(&out, "app").unwrap();
        std::fs::remove_file(out.join(&filename)).unwrap();
        let report = group.build_report(&out, "app").unwrap();
        assert!(report.rebuilt);
        assert_eq!(report.filename, filename);
        assert!(out.join(&filename).exists());
    }
}
