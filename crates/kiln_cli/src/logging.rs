//! Tracing subscriber setup for the `kiln` binary.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

static INIT_ONCE: Once = Once::new();

/// Default filter directive for the given verbosity flags.
///
/// `--quiet` wins over `--verbose`.
pub fn default_directive(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "kiln=error"
    } else if global.verbose {
        "kiln=debug"
    } else {
        "kiln=info"
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the flags.
///
/// Output goes to stderr so that `--format json` keeps stdout clean.
pub fn init(global: &GlobalArgs) {
    let directive = default_directive(global);
    INIT_ONCE.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            config: None,
        }
    }

    #[test]
    fn directive_levels() {
        assert_eq!(default_directive(&global(false, false)), "kiln=info");
        assert_eq!(default_directive(&global(false, true)), "kiln=debug");
        assert_eq!(default_directive(&global(true, false)), "kiln=error");
        assert_eq!(default_directive(&global(true, true)), "kiln=error");
    }

    #[test]
    fn init_idempotent() {
        init(&global(true, false));
        init(&global(false, true));
    }
}
