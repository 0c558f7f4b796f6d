//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.output.dir.is_empty() {
        return Err(ConfigError::MissingField("output.dir".to_string()));
    }

    let tools = &config.tools;
    if tools.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tools.timeout_secs must be greater than zero".to_string(),
        ));
    }
    for (field, command) in [
        ("less", &tools.less),
        ("coffee", &tools.coffee),
        ("css_compressor", &tools.css_compressor),
        ("js_compressor", &tools.js_compressor),
    ] {
        if command.first().map_or(true, |program| program.is_empty()) {
            return Err(ConfigError::MissingField(format!("tools.{field}")));
        }
    }

    let mut identities: HashMap<(PathBuf, &str), &str> = HashMap::new();
    for (key, group) in &config.groups {
        let invalid = |reason: String| ConfigError::InvalidGroup {
            group: key.clone(),
            reason,
        };
        if has_separator(key) {
            return Err(invalid("name must not contain a path separator".to_string()));
        }
        if let Some(name) = &group.name {
            if has_separator(name) {
                return Err(invalid(format!(
                    "artifact name '{name}' must not contain a path separator"
                )));
            }
        }
        if group.sources.is_empty() {
            return Err(invalid("no sources".to_string()));
        }

        let dir = normalize(group.dir.as_deref().unwrap_or(&config.output.dir));
        let name = group.name.as_deref().unwrap_or(key);
        if let Some(first) = identities.insert((dir.clone(), name), key) {
            return Err(ConfigError::DuplicateGroup {
                first: first.to_string(),
                second: key.clone(),
                dir,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Drops `.` components and trailing slashes so equivalent spellings of an
/// output directory compare equal.
fn normalize(dir: &str) -> PathBuf {
    Path::new(dir)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn has_separator(name: &str) -> bool {
    name.contains(['/', '\\'])
}
