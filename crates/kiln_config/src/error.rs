//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The configuration file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A group named on the command line is not configured.
    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    /// A required `[tools]` or `[output]` value is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A `[groups.*]` table is not usable.
    #[error("group '{group}': {reason}")]
    InvalidGroup {
        /// The group's table key.
        group: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two groups would write the same artifact and ledger files.
    #[error("groups '{first}' and '{second}' both build '{name}' into {}", dir.display())]
    DuplicateGroup {
        /// The group that claimed the identity first, in name order.
        first: String,
        /// The conflicting group.
        second: String,
        /// The shared output directory, relative to the project root.
        dir: PathBuf,
        /// The shared artifact prefix.
        name: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = ConfigError::Io {
            path: PathBuf::from("site/kiln.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to read site/kiln.toml: not found");
    }

    #[test]
    fn invalid_group_names_the_group() {
        let err = ConfigError::InvalidGroup {
            group: "admin".to_string(),
            reason: "no sources".to_string(),
        };
        assert_eq!(err.to_string(), "group 'admin': no sources");
    }

    #[test]
    fn duplicate_group_names_both_groups() {
        let err = ConfigError::DuplicateGroup {
            first: "a".to_string(),
            second: "b".to_string(),
            dir: PathBuf::from("static"),
            name: String::new(),
        };
        assert_eq!(err.to_string(), "groups 'a' and 'b' both build '' into static");
    }
}
