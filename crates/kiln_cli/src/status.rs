//! `kiln status`: reports which groups a build would regenerate.
//!
//! Reads sources and the ledger only. No tool runs and nothing is written.

use kiln_assets::GroupStatus;

use crate::pipeline::{asset_pipeline, configure_group, load_project};
use crate::{GlobalArgs, StatusArgs};

/// Runs the `kiln status` command.
///
/// Returns exit code 1 if any group could not be checked.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let groups = kiln_config::resolve_groups(&config, &root, &args.groups)?;
    let pipeline = asset_pipeline(&root, &config)?;

    let mut failed = 0;
    for group in &groups {
        match configure_group(&pipeline, group).status(&group.dir, &group.name) {
            Ok(status) => println!("{}: {}", group.key, describe(&status)),
            Err(e) => {
                eprintln!("error: group '{}': {e}", group.key);
                failed += 1;
            }
        }
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

fn describe(status: &GroupStatus) -> String {
    match status {
        GroupStatus::UpToDate { filename } => format!("up-to-date {filename}"),
        GroupStatus::Stale { previous: Some(previous) } => format!("stale (was {previous})"),
        GroupStatus::Stale { previous: None } => "stale".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_statuses() {
        let up = GroupStatus::UpToDate {
            filename: "app-00ff.css".to_string(),
        };
        assert_eq!(describe(&up), "up-to-date app-00ff.css");
        assert_eq!(describe(&GroupStatus::Stale { previous: None }), "stale");
        let stale = GroupStatus::Stale {
            previous: Some("app-00ff.css".to_string()),
        };
        assert_eq!(describe(&stale), "stale (was app-00ff.css)");
    }

    #[cfg(unix)]
    #[test]
    fn status_after_build_is_up_to_date() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(
            root.join("kiln.toml"),
            r#"
[tools]
css_compressor = ["cat"]

[groups.app]
sources = ["a.css"]
"#,
        )
        .unwrap();
        std::fs::write(root.join("a.css"), "a{}").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(root.join("kiln.toml").to_str().unwrap().to_string()),
        };

        let (root_dir, config) = load_project(&global).unwrap();
        let group = kiln_config::resolve_group(&config, &root_dir, "app").unwrap();
        let pipeline = asset_pipeline(&root_dir, &config).unwrap();
        let assets = configure_group(&pipeline, &group);

        assert_eq!(
            assets.status(&group.dir, &group.name).unwrap(),
            GroupStatus::Stale { previous: None }
        );
        let filename = assets.build(&group.dir, &group.name).unwrap();
        assert_eq!(
            assets.status(&group.dir, &group.name).unwrap(),
            GroupStatus::UpToDate { filename }
        );

        let args = StatusArgs { groups: vec![] };
        assert_eq!(run(&args, &global).unwrap(), 0);
    }
}
