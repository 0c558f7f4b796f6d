//! Group resolution: applying defaults from the project-wide settings.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// A group with every optional setting filled in, ready to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    /// The table key under `[groups]`.
    pub key: String,
    /// Artifact filename prefix; empty for none.
    pub name: String,
    /// Absolute output directory.
    pub dir: PathBuf,
    /// Source patterns, in order.
    pub sources: Vec<String>,
    /// Whether to compress the artifact.
    pub compress: bool,
    /// Whether to join adjacent fragments.
    pub join: bool,
}

/// Resolves a named group against the project root.
///
/// The artifact prefix defaults to the group key, and the output directory
/// defaults to `[output] dir`. Relative directories are joined onto `root`.
pub fn resolve_group(
    config: &ProjectConfig,
    root: &Path,
    key: &str,
) -> Result<ResolvedGroup, ConfigError> {
    let group = config
        .groups
        .get(key)
        .ok_or_else(|| ConfigError::UnknownGroup(key.to_string()))?;

    let dir = group.dir.as_deref().unwrap_or(&config.output.dir);

    Ok(ResolvedGroup {
        key: key.to_string(),
        name: group.name.clone().unwrap_or_else(|| key.to_string()),
        dir: root.join(dir),
        sources: group.sources.clone(),
        compress: group.compress,
        join: group.join,
    })
}

/// Resolves the selected groups, or every group in name order when `selected`
/// is empty.
///
/// Fails on the first unknown name before anything is resolved.
pub fn resolve_groups(
    config: &ProjectConfig,
    root: &Path,
    selected: &[String],
) -> Result<Vec<ResolvedGroup>, ConfigError> {
    if selected.is_empty() {
        return config
            .groups
            .keys()
            .map(|key| resolve_group(config, root, key))
            .collect();
    }
    if let Some(unknown) = selected.iter().find(|key| !config.groups.contains_key(*key)) {
        return Err(ConfigError::UnknownGroup(unknown.clone()));
    }
    selected
        .iter()
        .map(|key| resolve_group(config, root, key))
        .collect()
}
