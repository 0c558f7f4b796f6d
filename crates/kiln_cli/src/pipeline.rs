//! Shared helpers for CLI commands: project discovery, configuration loading,
//! and construction of the asset pipeline from `[tools]`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_assets::{
    AssetGroup, AssetPipeline, ExternalCompressor, ExternalTool, GlobResolver, Toolchain,
};
use kiln_config::{ProjectConfig, ResolvedGroup, ToolsConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the project configuration and returns it with the project root.
///
/// With `--config`, a file path is loaded directly and its parent becomes the
/// root; a directory path is treated as the root. Otherwise the current
/// directory and its ancestors are searched for `kiln.toml`.
pub fn load_project(
    global: &GlobalArgs,
) -> Result<(PathBuf, ProjectConfig), Box<dyn std::error::Error>> {
    let Some(config_path) = &global.config else {
        let root = find_project_root(&std::env::current_dir()?)?;
        let config = kiln_config::load_config(&root)?;
        return Ok((root, config));
    };

    let path = PathBuf::from(config_path);
    if path.is_file() {
        let content = std::fs::read_to_string(&path)?;
        let config = kiln_config::load_config_from_str(&content)?;
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((root, config))
    } else {
        let config = kiln_config::load_config(&path)?;
        Ok((path, config))
    }
}

/// Builds the external toolchain described by `[tools]`.
pub fn toolchain_from_config(tools: &ToolsConfig) -> Result<Toolchain, Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(tools.timeout_secs);
    let tool = |field: &str, command: &[String]| {
        ExternalTool::from_command(command)
            .map(|tool| tool.with_timeout(timeout))
            .ok_or_else(|| format!("tools.{field} has no program"))
    };

    Ok(Toolchain::new(
        tool("less", &tools.less)?,
        tool("coffee", &tools.coffee)?,
        ExternalCompressor {
            style: tool("css_compressor", &tools.css_compressor)?,
            script: tool("js_compressor", &tools.js_compressor)?,
        },
    ))
}

/// Creates a pipeline whose source patterns resolve against `root`.
pub fn asset_pipeline(
    root: &Path,
    config: &ProjectConfig,
) -> Result<AssetPipeline, Box<dyn std::error::Error>> {
    let toolchain = toolchain_from_config(&config.tools)?;
    Ok(AssetPipeline::new(toolchain).with_resolver(GlobResolver::new(root)))
}

/// Configures an asset group on `pipeline` from its resolved settings.
pub fn configure_group<'p>(pipeline: &'p AssetPipeline, group: &ResolvedGroup) -> AssetGroup<'p> {
    let mut assets = pipeline.group(&group.sources);
    assets.set_compress(group.compress).set_join(group.join);
    assets
}
