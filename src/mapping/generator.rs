/*
Inputs (TOON):

    artifacts  - project outputs (target name, display name, source, project)

    entries    - file entries already declared in the manifest

    mappings   - explicit target name -> entry id choices made earlier

Outputs:

    an in-memory manifest carrying entries + explicit mappings

    a live MappingSession over it
*/
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::error::MappingError;
use crate::core::session::MappingSession;
use crate::core::types::{Artifact, FileId, ManifestEntry, file_name_of};
use crate::mapping::manifest::{InMemoryManifest, Manifest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitMapping {
    pub target_name: String,
    pub entry: FileId,
}

/// Everything needed to open a mapping session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSpec {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
    #[serde(default)]
    pub mappings: Vec<ExplicitMapping>,
}

impl SessionSpec {
    pub fn from_toon(input: &str) -> Result<Self, MappingError> {
        Ok(toon_format::decode_default(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toon(&text)
    }

    pub fn to_toon(&self) -> Result<String, MappingError> {
        Ok(toon_format::encode_default(self)?)
    }

    /// Build the manifest and open a session over it.
    ///
    /// Artifacts without a display name get the file name of their target.
    /// Two entries with one id are rejected.
    pub fn build(&self) -> Result<(Rc<RefCell<InMemoryManifest>>, MappingSession), MappingError> {
        let mut manifest = InMemoryManifest::default();
        for entry in &self.entries {
            manifest.declare(entry.clone())?;
        }
        for m in &self.mappings {
            manifest = manifest.with_mapping(m.target_name.clone(), m.entry.as_str());
        }
        let manifest = manifest.shared();

        let artifacts = self.artifacts.iter().cloned().map(|mut a| {
            if a.display_name.is_empty() {
                a.display_name = file_name_of(&a.target_name).to_string();
            }
            a
        });

        let session = MappingSession::new(artifacts, manifest.clone())?;
        Ok((manifest, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::MappingState;

    const SESSION: &str = "\
artifacts[3]{display_name,target_name,source_name,project}:
  app.exe,bin/app.exe,obj/app.exe,App
  core.dll,bin/core.dll,obj/core.dll,Core
  lib.dll,bin/lib.dll,obj/lib.dll,Core
entries[2]{id,name,source}:
  F_app,app.exe,obj/app.exe
  F_lib,lib.dll,obj/lib.dll
mappings[1]{target_name,entry}:
  bin/lib.dll,F_lib
";

    #[test]
    fn builds_a_live_session_from_toon() {
        let spec = SessionSpec::from_toon(SESSION).unwrap();
        assert_eq!(spec.artifacts.len(), 3);
        assert_eq!(spec.mappings[0].entry, FileId::new("F_lib"));

        let (manifest, session) = spec.build().unwrap();
        assert_eq!(session.mapping("bin/app.exe").unwrap().state(), MappingState::Unique);
        assert_eq!(session.mapping("bin/core.dll").unwrap().state(), MappingState::Unmapped);

        let lib = session.mapping("bin/lib.dll").unwrap();
        assert_eq!(lib.state(), MappingState::Resolved);
        assert_eq!(lib.id().as_str(), "F_lib");
        assert!(lib.can_clear_mapping());

        session.add_files(["bin/core.dll"]).unwrap();
        assert_eq!(manifest.borrow().entries().len(), 3);
        session.check_invariants().unwrap();
    }

    #[test]
    fn missing_display_name_falls_back_to_file_name() {
        let spec = SessionSpec {
            artifacts: vec![Artifact {
                display_name: String::new(),
                target_name: "x64/native.dll".into(),
                source_name: String::new(),
                project: "P".into(),
            }],
            ..Default::default()
        };
        let (_, session) = spec.build().unwrap();
        assert_eq!(session.mappings()[0].display_name(), "native.dll");
    }

    #[test]
    fn duplicate_entry_ids_are_rejected() {
        let spec = SessionSpec {
            entries: vec![ManifestEntry::new("F1", "a", ""), ManifestEntry::new("F1", "b", "")],
            ..Default::default()
        };
        assert!(matches!(spec.build(), Err(MappingError::IdCollision { .. })));
    }

    #[test]
    fn unreadable_input_is_an_io_error() {
        let err = SessionSpec::from_path("/nonexistent/session.toon").unwrap_err();
        assert!(matches!(err, MappingError::Io(_)));
    }
}
