use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Identifier a manifest assigns to one of its file entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        FileId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can be matched by file name.
pub trait Named {
    fn name(&self) -> &str;
}

//OrdinalIgnoreCase-like comparison; ascii fast path first
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || (!a.is_ascii() && a.to_lowercase() == b.to_lowercase())
}

/// A build output of a project that may need an entry in the manifest.
///
/// `target_name` is the path relative to the output directory and is the
/// identity of the artifact; `display_name` is the bare file name used for
/// matching against manifest entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub display_name: String,
    pub target_name: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub project: String,
}

impl Artifact {
    /// Build an artifact whose display name is the file name of `target_name`.
    pub fn new(target_name: impl Into<String>, source_name: impl Into<String>, project: impl Into<String>) -> Self {
        let target_name = target_name.into();
        let display_name = file_name_of(&target_name).to_string();
        Artifact {
            display_name,
            target_name,
            source_name: source_name.into(),
            project: project.into(),
        }
    }

    /// Extension of the target file name without the dot, empty when there is none.
    pub fn extension(&self) -> &str {
        Path::new(file_name_of(&self.target_name))
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    }
}

//target names come from projects on any platform, so split on both separators
pub(crate) fn file_name_of(target_name: &str) -> &str {
    target_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(target_name)
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.target_name == other.target_name
    }
}

impl Eq for Artifact {}

impl Named for Artifact {
    fn name(&self) -> &str {
        &self.display_name
    }
}

/// A file entry already declared in the manifest. Equality is by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: FileId,
    pub name: String,
    #[serde(default)]
    pub source: String,
}

impl ManifestEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: impl Into<String>) -> Self {
        ManifestEntry {
            id: FileId::new(id),
            name: name.into(),
            source: source.into(),
        }
    }
}

impl PartialEq for ManifestEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ManifestEntry {}

/// Membership record of a manifest entry in the unmapped target registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedFile {
    pub node: ManifestEntry,
}

impl UnmappedFile {
    pub fn new(node: ManifestEntry) -> Self {
        UnmappedFile { node }
    }
}

impl Named for UnmappedFile {
    fn name(&self) -> &str {
        &self.node.name
    }
}
