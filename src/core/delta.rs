// incremental changes to either side of a live session
use std::rc::Rc;

use tracing::debug;

use crate::core::error::MappingError;
use crate::core::mapping::FileMapping;
use crate::core::session::MappingSession;
use crate::core::types::{Artifact, FileId, ManifestEntry, UnmappedFile};

impl MappingSession {
    /// A manifest entry declared outside the engine becomes a free candidate.
    pub fn declare_entry(&self, entry: ManifestEntry) -> Result<(), MappingError> {
        self.manifest.borrow_mut().declare(entry.clone())?;
        debug!(entry = %entry.id, name = %entry.name, "entry declared");
        self.unmapped_files.add(UnmappedFile::new(entry));
        Ok(())
    }

    /// Drop an entry from the manifest. A mapping bound to it is released
    /// first, whatever the default-binding rule says, since the entry is gone.
    pub fn retract_entry(&self, id: &FileId) -> Result<Option<ManifestEntry>, MappingError> {
        let owner = self
            .mappings
            .iter()
            .find(|m| m.mapped_node().is_some_and(|n| &n.id == id))
            .cloned();
        if let Some(owner) = owner {
            owner.release()?;
        }

        self.unmapped_files.remove_where(|f| &f.node.id == id);
        let retracted = self.manifest.borrow_mut().retract(id);
        if retracted.is_some() {
            debug!(entry = %id, "entry retracted");
        }
        Ok(retracted)
    }

    /// A new project output showed up. Returns `None` when the target name
    /// already has a mapping.
    pub fn add_artifact(&mut self, artifact: Artifact) -> Result<Option<Rc<FileMapping>>, MappingError> {
        if self.by_target.contains_key(&artifact.target_name) {
            return Ok(None);
        }

        let mapping = FileMapping::new(artifact, &self.unmapped_artifacts, &self.manifest, &self.unmapped_files)?;
        if let Some(node) = mapping.mapped_node() {
            //a manifest that does not track explicit binds could hand us a held entry
            if let Some(holder) = self.mappings.iter().find(|m| m.mapped_node().is_some_and(|n| n == node)) {
                return Err(MappingError::EntryAlreadyBound {
                    id: node.id,
                    bound_to: holder.target_name().to_string(),
                });
            }
        }

        match mapping.mapped_node() {
            Some(node) => {
                //bound by convention: its entry is no longer free
                self.unmapped_files.remove_where(|f| f.node == node);
            }
            None => self.unmapped_artifacts.add(mapping.artifact().clone()),
        }

        debug!(artifact = %mapping.target_name(), state = ?mapping.state(), "artifact added");
        self.by_target.insert(mapping.target_name().to_string(), self.mappings.len());
        self.mappings.push(Rc::clone(&mapping));
        Ok(Some(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::core::state::MappingState;
    use crate::mapping::manifest::{InMemoryManifest, Manifest, SharedManifest, default_file_id};

    fn mk_session(targets: &[&str], entries: Vec<ManifestEntry>) -> MappingSession {
        let manifest = InMemoryManifest::new(entries).shared();
        MappingSession::new(targets.iter().map(|t| Artifact::new(*t, "", "App")), manifest).unwrap()
    }

    #[test]
    fn declaring_an_entry_turns_unmapped_into_unique() {
        let s = mk_session(&["bin/app.dll"], vec![]);
        let m = Rc::clone(s.mapping("bin/app.dll").unwrap());
        assert_eq!(m.state(), MappingState::Unmapped);

        s.declare_entry(ManifestEntry::new("F1", "app.dll", "")).unwrap();
        assert_eq!(m.state(), MappingState::Unique);

        s.declare_entry(ManifestEntry::new("F2", "App.dll", "")).unwrap();
        assert_eq!(m.state(), MappingState::Ambiguous);

        assert!(s.declare_entry(ManifestEntry::new("F2", "x", "")).is_err());
        s.check_invariants().unwrap();
    }

    #[test]
    fn retracting_a_bound_entry_releases_the_mapping() {
        let s = mk_session(&["app.dll"], vec![ManifestEntry::new("app.dll", "app.dll", "")]);
        let m = Rc::clone(s.mapping("app.dll").unwrap());
        assert_eq!(m.state(), MappingState::Resolved);

        let gone = s.retract_entry(&FileId::new("app.dll")).unwrap().unwrap();
        assert_eq!(gone.name, "app.dll");
        assert_eq!(m.state(), MappingState::Unmapped);
        assert!(s.unmapped_files().is_empty());
        assert!(s.unmapped_artifacts().contains(m.artifact()));
        s.check_invariants().unwrap();

        assert!(s.retract_entry(&FileId::new("app.dll")).unwrap().is_none());
    }

    #[test]
    fn retracting_a_free_entry_updates_candidates() {
        let s = mk_session(&["bin/app.dll"], vec![ManifestEntry::new("F1", "app.dll", "")]);
        assert_eq!(s.mapping("bin/app.dll").unwrap().state(), MappingState::Unique);

        s.retract_entry(&FileId::new("F1")).unwrap();
        assert_eq!(s.mapping("bin/app.dll").unwrap().state(), MappingState::Unmapped);
    }

    #[test]
    fn added_artifact_joins_the_contention() {
        let mut s = mk_session(&["x86/app.dll"], vec![ManifestEntry::new("F1", "app.dll", "")]);
        assert_eq!(s.mapping("x86/app.dll").unwrap().state(), MappingState::Unique);

        let added = s.add_artifact(Artifact::new("x64/app.dll", "", "App")).unwrap().unwrap();
        assert_eq!(added.state(), MappingState::Ambiguous);
        assert_eq!(s.mapping("x86/app.dll").unwrap().state(), MappingState::Ambiguous);

        assert!(s.add_artifact(Artifact::new("x64/app.dll", "", "App")).unwrap().is_none());
        s.check_invariants().unwrap();
    }

    #[test]
    fn added_artifact_claims_its_convention_entry() {
        let mut s = mk_session(&[], vec![ManifestEntry::new("tool.exe", "tool.exe", "")]);
        assert_eq!(s.unmapped_files().len(), 1);

        let added = s.add_artifact(Artifact::new("tool.exe", "", "App")).unwrap().unwrap();
        assert_eq!(added.state(), MappingState::Resolved);
        assert!(s.unmapped_files().is_empty());
        s.check_invariants().unwrap();
    }

    #[test]
    fn added_artifact_cannot_take_an_entry_mapped_explicitly_elsewhere() {
        let mut s = mk_session(&["bin/z.dll"], vec![ManifestEntry::new("z.dll", "z.dll", "")]);
        assert!(s.map("bin/z.dll", &FileId::new("z.dll")).unwrap());

        let err = s.add_artifact(Artifact::new("z.dll", "", "App")).unwrap_err();
        assert!(matches!(err, MappingError::IdCollision { ref existing, .. } if existing == "bin/z.dll"));
        assert_eq!(s.mappings().len(), 1);
        assert!(s.mapping("z.dll").is_none());
        assert_eq!(s.mapping("bin/z.dll").unwrap().state(), MappingState::Resolved);
        s.check_invariants().unwrap();
    }

    //only knows the naming convention, so explicit binds are invisible to file_id
    struct ConventionOnly(InMemoryManifest);

    impl Manifest for ConventionOnly {
        fn file_id(&mut self, target_name: &str) -> Result<FileId, MappingError> {
            Ok(default_file_id(target_name))
        }
        fn find_entry(&self, id: &FileId) -> Option<ManifestEntry> {
            self.0.find_entry(id)
        }
        fn map_file(&mut self, target_name: &str, entry: &ManifestEntry) -> Result<(), MappingError> {
            self.0.map_file(target_name, entry)
        }
        fn unmap_file(&mut self, target_name: &str) {
            self.0.unmap_file(target_name)
        }
        fn has_default_file_id(&self, mapping: &FileMapping) -> bool {
            self.0.has_default_file_id(mapping)
        }
        fn add_file_node(&mut self, mapping: &FileMapping) -> Result<ManifestEntry, MappingError> {
            self.0.add_file_node(mapping)
        }
        fn file_nodes(&self) -> Vec<ManifestEntry> {
            self.0.file_nodes()
        }
        fn declare(&mut self, entry: ManifestEntry) -> Result<(), MappingError> {
            self.0.declare(entry)
        }
        fn retract(&mut self, id: &FileId) -> Option<ManifestEntry> {
            self.0.retract(id)
        }
    }

    #[test]
    fn added_artifact_is_rejected_when_its_convention_entry_is_held() {
        let inner = InMemoryManifest::new([ManifestEntry::new("z.dll", "z.dll", "")]);
        let manifest: SharedManifest = Rc::new(RefCell::new(ConventionOnly(inner)));
        let mut s = MappingSession::new([Artifact::new("bin/z.dll", "", "App")], manifest).unwrap();
        s.resolve_files(["bin/z.dll"]).unwrap();

        let err = s.add_artifact(Artifact::new("z.dll", "", "App")).unwrap_err();
        match err {
            MappingError::EntryAlreadyBound { id, bound_to } => {
                assert_eq!(id.as_str(), "z.dll");
                assert_eq!(bound_to, "bin/z.dll");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(s.mappings().len(), 1);
        assert!(s.unmapped_artifacts().is_empty());
        s.check_invariants().unwrap();
    }
}
