//! Kiln CLI: builds content-addressed stylesheet and script bundles.
//!
//! Provides `kiln init` for writing a starter `kiln.toml`, `kiln build` for
//! regenerating asset groups, and `kiln status` for checking which groups
//! are stale without touching the output directory.

#![warn(missing_docs)]

mod build;
mod init;
mod logging;
mod pipeline;
mod status;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln: deterministic asset bundling.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln asset builder")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter `kiln.toml`.
    Init {
        /// Directory to initialize (created if missing). Defaults to the
        /// current directory.
        path: Option<String>,
    },
    /// Build asset groups.
    Build(BuildArgs),
    /// Report which asset groups are out of date.
    Status(StatusArgs),
}

/// Arguments for the `kiln build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Groups to build. Builds every group when omitted.
    pub groups: Vec<String>,

    /// Output format for build results.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Groups to check. Checks every group when omitted.
    pub groups: Vec<String>,
}

/// Build result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    logging::init(&global);

    let result = match cli.command {
        Command::Init { path } => init::run(path, &global),
        Command::Build(ref args) => build::run(args, &global),
        Command::Status(ref args) => status::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_init_default() {
        let cli = Cli::parse_from(["kiln", "init"]);
        match cli.command {
            Command::Init { path } => assert!(path.is_none()),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn parse_init_with_path() {
        let cli = Cli::parse_from(["kiln", "init", "site"]);
        match cli.command {
            Command::Init { path } => assert_eq!(path.as_deref(), Some("site")),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn parse_build_default() {
        let cli = Cli::parse_from(["kiln", "build"]);
        match cli.command {
            Command::Build(ref args) => {
                assert!(args.groups.is_empty());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_with_groups_and_format() {
        let cli = Cli::parse_from(["kiln", "build", "app", "admin", "--format", "json"]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.groups, vec!["app", "admin"]);
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_status_with_group() {
        let cli = Cli::parse_from(["kiln", "status", "app"]);
        match cli.command {
            Command::Status(ref args) => assert_eq!(args.groups, vec!["app"]),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kiln", "--quiet", "build"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "status", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["kiln", "--config", "/srv/site/kiln.toml", "build"]);
        assert_eq!(cli.config.as_deref(), Some("/srv/site/kiln.toml"));
    }

    #[test]
    fn reject_unknown_format() {
        assert!(Cli::try_parse_from(["kiln", "build", "--format", "xml"]).is_err());
    }
}
