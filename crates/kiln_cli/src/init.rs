//! `kiln init`: writes a starter `kiln.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_config::CONFIG_FILE;

use crate::GlobalArgs;

const STARTER_CONFIG: &str = r#"# Kiln asset groups. Each group builds into one content-addressed file.

[output]
dir = "static"

[tools]
timeout_secs = 60
less = ["lessc", "-"]
coffee = ["coffee", "-sc"]
css_compressor = ["yuicompressor", "--type", "css"]
js_compressor = ["yuicompressor", "--type", "js"]

[groups.app]
sources = ["assets/style/*.css", "assets/style/*.less"]

[groups.site]
sources = ["assets/script/*.js", "assets/script/*.coffee"]
"#;

/// Runs the `kiln init` command.
///
/// Creates `path` if needed and writes `kiln.toml` into it. Refuses to
/// overwrite an existing configuration.
pub fn run(path: Option<String>, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };
    let written = write_starter(&project_dir)?;
    if !global.quiet {
        eprintln!("     Created {}", written.display());
    }
    Ok(0)
}

fn write_starter(project_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let config_path = project_dir.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()).into());
    }
    fs::create_dir_all(project_dir)?;
    fs::write(&config_path, STARTER_CONFIG)?;
    Ok(config_path)
}
