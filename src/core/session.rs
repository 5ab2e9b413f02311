// the set of mappings sharing one pair of registries
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::error::MappingError;
use crate::core::mapping::FileMapping;
use crate::core::registry::Registry;
use crate::core::types::{Artifact, FileId, UnmappedFile};
use crate::mapping::manifest::SharedManifest;

/// Owns the two unmapped registries and one [`FileMapping`] per artifact.
///
/// Artifacts are keyed by target name; a repeated target name is skipped.
pub struct MappingSession {
    pub(crate) manifest: SharedManifest,
    pub(crate) unmapped_artifacts: Registry<Artifact>,
    pub(crate) unmapped_files: Registry<UnmappedFile>,
    pub(crate) mappings: Vec<Rc<FileMapping>>,
    pub(crate) by_target: HashMap<String, usize>,
}

impl MappingSession {
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>, manifest: SharedManifest) -> Result<Self, MappingError> {
        let unmapped_artifacts = Registry::new();
        let unmapped_files = Registry::new();
        let mut mappings: Vec<Rc<FileMapping>> = Vec::new();
        let mut by_target = HashMap::new();

        for artifact in artifacts {
            if by_target.contains_key(&artifact.target_name) {
                warn!(artifact = %artifact.target_name, "duplicate artifact skipped");
                continue;
            }
            let mapping = FileMapping::new(artifact, &unmapped_artifacts, &manifest, &unmapped_files)?;
            by_target.insert(mapping.target_name().to_string(), mappings.len());
            mappings.push(mapping);
        }

        //seed both registries once every mapping exists; each seed is one batch
        let bound: HashSet<FileId> = mappings
            .iter()
            .filter_map(|m| m.mapped_node().map(|n| n.id))
            .collect();
        let nodes = manifest.borrow().file_nodes();

        unmapped_artifacts.extend(
            mappings
                .iter()
                .filter(|m| !m.is_mapped())
                .map(|m| m.artifact().clone()),
        );
        unmapped_files.extend(
            nodes
                .into_iter()
                .filter(|n| !bound.contains(&n.id))
                .map(UnmappedFile::new),
        );

        debug!(
            mappings = mappings.len(),
            unmapped_artifacts = unmapped_artifacts.len(),
            unmapped_files = unmapped_files.len(),
            "mapping session ready"
        );

        Ok(MappingSession {
            manifest,
            unmapped_artifacts,
            unmapped_files,
            mappings,
            by_target,
        })
    }

    pub fn manifest(&self) -> &SharedManifest {
        &self.manifest
    }

    pub fn mappings(&self) -> &[Rc<FileMapping>] {
        &self.mappings
    }

    pub fn mapping(&self, target_name: &str) -> Option<&Rc<FileMapping>> {
        self.by_target.get(target_name).map(|&i| &self.mappings[i])
    }

    pub fn unmapped_artifacts(&self) -> &Registry<Artifact> {
        &self.unmapped_artifacts
    }

    pub fn unmapped_files(&self) -> &Registry<UnmappedFile> {
        &self.unmapped_files
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn expect_mapping(&self, target_name: &str) -> Result<&Rc<FileMapping>, MappingError> {
        self.mapping(target_name)
            .ok_or_else(|| MappingError::UnknownArtifact(target_name.to_string()))
    }

    //run a gated operation over a selection, counting entries it changed
    fn for_selection<'a>(
        &self,
        selection: impl IntoIterator<Item = &'a str>,
        op: impl Fn(&FileMapping) -> Result<bool, MappingError>,
    ) -> Result<usize, MappingError> {
        let targets: Vec<Rc<FileMapping>> = selection
            .into_iter()
            .map(|t| self.expect_mapping(t).cloned())
            .collect::<Result<_, _>>()?;

        let mut changed = 0;
        for mapping in targets {
            if op(mapping.as_ref())? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Add a manifest entry for every selected artifact that has no candidate.
    pub fn add_files<'a>(&self, selection: impl IntoIterator<Item = &'a str>) -> Result<usize, MappingError> {
        self.for_selection(selection, FileMapping::add_file)
    }

    pub fn clear_mappings<'a>(&self, selection: impl IntoIterator<Item = &'a str>) -> Result<usize, MappingError> {
        self.for_selection(selection, FileMapping::clear_mapping)
    }

    pub fn resolve_files<'a>(&self, selection: impl IntoIterator<Item = &'a str>) -> Result<usize, MappingError> {
        self.for_selection(selection, FileMapping::resolve_file)
    }

    /// Bind one artifact to a specific free entry.
    pub fn map(&self, target_name: &str, entry_id: &FileId) -> Result<bool, MappingError> {
        let mapping = self.expect_mapping(target_name)?;
        let entry = self
            .manifest
            .borrow()
            .find_entry(entry_id)
            .ok_or_else(|| MappingError::EntryNotFound(entry_id.clone()))?;
        mapping.map_to(entry)
    }
}
