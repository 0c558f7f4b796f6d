//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Where artifacts are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// External compiler and compressor commands.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Named asset groups, built in name order.
    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
}

/// Output location shared by all groups.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Command lines for the external tools.
///
/// Each command is the program followed by its arguments. Tools read their
/// input on stdin and write the result to stdout.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    /// Seconds one tool invocation may take before it is killed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Stylesheet source compiler.
    #[serde(default = "default_less")]
    pub less: Vec<String>,
    /// Script source compiler.
    #[serde(default = "default_coffee")]
    pub coffee: Vec<String>,
    /// Stylesheet compressor.
    #[serde(default = "default_css_compressor")]
    pub css_compressor: Vec<String>,
    /// Script compressor.
    #[serde(default = "default_js_compressor")]
    pub js_compressor: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            less: default_less(),
            coffee: default_coffee(),
            css_compressor: default_css_compressor(),
            js_compressor: default_js_compressor(),
        }
    }
}

/// One asset group: ordered sources that build into a single artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Source paths or glob patterns, in output order.
    ///
    /// Accepts a single string or a list of strings.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub sources: Vec<String>,
    /// Whether to compress the artifact.
    #[serde(default = "default_true")]
    pub compress: bool,
    /// Whether to join adjacent source-language files before compiling.
    #[serde(default = "default_true")]
    pub join: bool,
    /// Artifact filename prefix. Defaults to the group's table key; an empty
    /// string omits the prefix.
    #[serde(default)]
    pub name: Option<String>,
    /// Output directory override, relative to the project root.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_output_dir() -> String {
    "static".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn default_less() -> Vec<String> {
    command(&["lessc", "-"])
}

fn default_coffee() -> Vec<String> {
    command(&["coffee", "-sc"])
}

fn default_css_compressor() -> Vec<String> {
    command(&["yuicompressor", "--type", "css"])
}

fn default_js_compressor() -> Vec<String> {
    command(&["yuicompressor", "--type", "js"])
}

fn default_true() -> bool {
    true
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `sources = "assets/*.js"` as well as
/// `sources = ["assets/lib/*.js", "assets/app.coffee"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_defaults() {
        let tools = ToolsConfig::default();
        assert_eq!(tools.timeout_secs, 60);
        assert_eq!(tools.less, vec!["lessc", "-"]);
        assert_eq!(tools.coffee, vec!["coffee", "-sc"]);
        assert_eq!(tools.css_compressor, vec!["yuicompressor", "--type", "css"]);
        assert_eq!(tools.js_compressor, vec!["yuicompressor", "--type", "js"]);
    }

    #[test]
    fn group_defaults() {
        let group: GroupConfig = toml::from_str(r#"sources = ["a.css"]"#).unwrap();
        assert!(group.compress);
        assert!(group.join);
        assert!(group.name.is_none());
        assert!(group.dir.is_none());
    }

    #[test]
    fn sources_accept_single_string() {
        let group: GroupConfig = toml::from_str(r#"sources = "assets/*.js""#).unwrap();
        assert_eq!(group.sources, vec!["assets/*.js"]);
    }

    #[test]
    fn sources_reject_numbers() {
        assert!(toml::from_str::<GroupConfig>("sources = 3").is_err());
    }
}
