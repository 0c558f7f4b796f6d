//! Fragment and output kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a single fragment, decided by its source extension.
///
/// Raw kinds are already in the output language. Source-language kinds must
/// pass through an external transform, after which they become the matching
/// compiled kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// A plain stylesheet (`.css`).
    RawStyle,
    /// A plain script (`.js`).
    RawScript,
    /// A stylesheet produced by the style transform.
    CompiledStyle,
    /// A script produced by the script transform.
    CompiledScript,
    /// Stylesheet source language input (`.less`).
    SourceStyleLang,
    /// Script source language input (`.coffee`).
    SourceScriptLang,
}

impl FragmentKind {
    /// Maps a file extension (without the leading dot) to a fragment kind.
    ///
    /// Returns `None` for unrecognized extensions. Matching is case-sensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "css" => Some(Self::RawStyle),
            "js" => Some(Self::RawScript),
            "less" => Some(Self::SourceStyleLang),
            "coffee" => Some(Self::SourceScriptLang),
            _ => None,
        }
    }

    /// The output kind this fragment contributes to once compiled.
    pub fn output_kind(self) -> OutputKind {
        match self {
            Self::RawStyle | Self::CompiledStyle | Self::SourceStyleLang => OutputKind::Style,
            Self::RawScript | Self::CompiledScript | Self::SourceScriptLang => OutputKind::Script,
        }
    }

    /// Returns `true` for source-language kinds, which are eligible for
    /// adjacency joining and require a transform.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::SourceStyleLang | Self::SourceScriptLang)
    }

    /// The kind a fragment has after its transform ran.
    ///
    /// Non-source kinds are returned unchanged.
    pub fn compiled(self) -> Self {
        match self {
            Self::SourceStyleLang => Self::CompiledStyle,
            Self::SourceScriptLang => Self::CompiledScript,
            other => other,
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RawStyle => "css",
            Self::RawScript => "js",
            Self::CompiledStyle => "compiled css",
            Self::CompiledScript => "compiled js",
            Self::SourceStyleLang => "less",
            Self::SourceScriptLang => "coffee",
        };
        f.write_str(s)
    }
}

/// The kind of a group's final artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// A `.css` artifact.
    Style,
    /// A `.js` artifact.
    Script,
}

impl OutputKind {
    /// File extension of artifacts of this kind, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Style => "css",
            Self::Script => "js",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
