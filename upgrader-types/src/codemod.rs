use camino::{Utf8Path, Utf8PathBuf};
use heck::ToTitleCase;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a codemod file transforms.
///
/// - code: source files, executed by an external source-transform engine
/// - document: structured (JSON) documents, transformed in-process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodemodKind {
    Code,
    Document,
}

impl CodemodKind {
    pub const ALL: [CodemodKind; 2] = [CodemodKind::Code, CodemodKind::Document];

    pub fn as_str(self) -> &'static str {
        match self {
            CodemodKind::Code => "code",
            CodemodKind::Document => "document",
        }
    }

    /// Split `<name>.<kind>.<ext>` into its parts.
    ///
    /// Returns `None` when the file does not follow the two-part suffix
    /// convention or names an unknown kind.
    pub fn split_filename(filename: &str) -> Option<(&str, CodemodKind, &str)> {
        let (rest, ext) = filename.rsplit_once('.')?;
        let (name, kind) = rest.rsplit_once('.')?;
        if name.is_empty() || ext.is_empty() {
            return None;
        }
        let kind = kind.parse::<CodemodKind>().ok()?;
        Some((name, kind, ext))
    }
}

impl fmt::Display for CodemodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodemodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(CodemodKind::Code),
            "document" => Ok(CodemodKind::Document),
            other => Err(format!("unknown codemod kind: {other}")),
        }
    }
}

/// A single version-scoped transformation file.
///
/// Identity is [`Codemod::uid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codemod {
    pub kind: CodemodKind,
    pub version: Version,
    pub base_directory: Utf8PathBuf,
    pub filename: String,
}

impl Codemod {
    pub fn new(
        kind: CodemodKind,
        version: Version,
        base_directory: impl Into<Utf8PathBuf>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            version,
            base_directory: base_directory.into(),
            filename: filename.into(),
        }
    }

    /// Filename with the `.<kind>.<ext>` suffix stripped.
    pub fn name(&self) -> &str {
        CodemodKind::split_filename(&self.filename)
            .map(|(name, _, _)| name)
            .unwrap_or(&self.filename)
    }

    /// File extension of the codemod itself (`ts`, `json`, ...).
    pub fn extension(&self) -> Option<&str> {
        Utf8Path::new(&self.filename).extension()
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.base_directory.join(&self.filename)
    }

    pub fn uid(&self) -> String {
        format!("{}-{}-{}", self.version, self.name(), self.kind)
    }

    /// Human title for tables and prompts, e.g. `Rename Entry Point`.
    pub fn format(&self) -> String {
        self.name().to_title_case()
    }
}

/// All codemods shipped for one version, in filename order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedCollection {
    pub version: Version,
    pub codemods: Vec<Codemod>,
}

impl VersionedCollection {
    pub fn new(version: Version, codemods: Vec<Codemod>) -> Self {
        Self { version, codemods }
    }

    pub fn len(&self) -> usize {
        self.codemods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codemods.is_empty()
    }
}
