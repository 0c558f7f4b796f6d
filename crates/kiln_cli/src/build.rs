//! `kiln build`: regenerates the selected asset groups.
//!
//! Groups build one after another in name order (or the order given on the
//! command line). A failing group is reported and the remaining groups are
//! still attempted; the exit code is 1 if any group failed.

use kiln_assets::{AssetPipeline, BuildReport};
use kiln_config::ResolvedGroup;
use serde::Serialize;

use crate::pipeline::{asset_pipeline, configure_group, load_project};
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Result of building one group, as printed by `--format json`.
#[derive(Debug, Serialize)]
pub struct GroupOutcome {
    /// The group's table key.
    pub group: String,
    /// Present when the build succeeded.
    #[serde(flatten)]
    pub report: Option<BuildReport>,
    /// Present when the build failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the `kiln build` command.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let groups = kiln_config::resolve_groups(&config, &root, &args.groups)?;

    if groups.is_empty() {
        if !global.quiet {
            eprintln!("warning: no asset groups configured");
        }
        return Ok(0);
    }

    let pipeline = asset_pipeline(&root, &config)?;
    let outcomes: Vec<GroupOutcome> = groups
        .iter()
        .map(|group| build_group(&pipeline, group))
        .collect();

    match args.format {
        ReportFormat::Text => {
            for outcome in &outcomes {
                match (&outcome.report, &outcome.error) {
                    (Some(report), _) => {
                        if !global.quiet {
                            println!("{} -> {}", outcome.group, report.filename);
                        }
                    }
                    (None, Some(error)) => eprintln!("error: group '{}': {error}", outcome.group),
                    (None, None) => {}
                }
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let rebuilt = outcomes
        .iter()
        .filter(|o| o.report.as_ref().is_some_and(|r| r.rebuilt))
        .count();

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Result: {} group(s), {} rebuilt, {} failed",
            outcomes.len(),
            rebuilt,
            failed
        );
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

fn build_group(pipeline: &AssetPipeline, group: &ResolvedGroup) -> GroupOutcome {
    let result = configure_group(pipeline, group).build_report(&group.dir, &group.name);
    match result {
        Ok(report) => GroupOutcome {
            group: group.key.clone(),
            report: Some(report),
            error: None,
        },
        Err(e) => {
            tracing::debug!(group = %group.key, error = ?e, "group failed to build");
            GroupOutcome {
                group: group.key.clone(),
                report: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// `cat` stands in for every tool so builds run without node tooling.
    const PASSTHROUGH_TOOLS: &str = r#"
[tools]
less = ["cat"]
coffee = ["cat"]
css_compressor = ["cat"]
js_compressor = ["cat"]
"#;

    fn write_project(root: &Path, groups: &str) -> String {
        let config = root.join("kiln.toml");
        fs::write(&config, format!("{PASSTHROUGH_TOOLS}\n{groups}")).unwrap();
        fs::create_dir_all(root.join("assets")).unwrap();
        config.to_str().unwrap().to_string()
    }

    fn global(config: String) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(config),
        }
    }

    fn build_args(groups: &[&str]) -> BuildArgs {
        BuildArgs {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            format: ReportFormat::Text,
        }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn build_writes_artifact_and_ledger() {
        let tmp = TempDir::new().unwrap();
        let config = write_project(tmp.path(), "[groups.app]\nsources = [\"assets/*.css\"]\n");
        fs::write(tmp.path().join("assets/a.css"), "a{}").unwrap();
        fs::write(tmp.path().join("assets/b.css"), "b{}").unwrap();

        let code = run(&build_args(&[]), &global(config)).unwrap();
        assert_eq!(code, 0);

        let names = listing(&tmp.path().join("static"));
        assert_eq!(names.len(), 2, "{names:?}");
        assert!(names.iter().any(|n| n == "asset-info-app-css"));
        let artifact = names.iter().find(|n| n.ends_with(".css")).unwrap();
        assert!(artifact.starts_with("app-"));
        let content = fs::read_to_string(tmp.path().join("static").join(artifact)).unwrap();
        assert_eq!(content, "a{}b{}");
    }

    #[test]
    fn failing_group_does_not_stop_others() {
        let tmp = TempDir::new().unwrap();
        let config = write_project(
            tmp.path(),
            r#"
[groups.broken]
sources = ["assets/missing/*.js"]

[groups.site]
sources = ["assets/site.js"]
name = ""
"#,
        );
        fs::write(tmp.path().join("assets/site.js"), "var a = 1;").unwrap();

        let code = run(&build_args(&[]), &global(config)).unwrap();
        assert_eq!(code, 1);

        let names = listing(&tmp.path().join("static"));
        assert!(names.iter().any(|n| n == "asset-info-js"));
        assert!(names.iter().all(|n| !n.contains("broken")));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = write_project(tmp.path(), "[groups.app]\nsources = [\"a.css\"]\n");
        let err = run(&build_args(&["nope"]), &global(config)).unwrap_err();
        assert!(err.to_string().contains("unknown group 'nope'"));
    }

    #[test]
    fn outcome_json_shape() {
        let outcome = GroupOutcome {
            group: "app".to_string(),
            report: None,
            error: Some("no input files".to_string()),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["group"], "app");
        assert_eq!(json["error"], "no input files");
        assert!(json.get("filename").is_none());
    }
}
