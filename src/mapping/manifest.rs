// manifest collaborator + in-memory implementation
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::core::error::MappingError;
use crate::core::mapping::FileMapping;
use crate::core::types::{FileId, ManifestEntry};

pub type SharedManifest = Rc<RefCell<dyn Manifest>>;

/// The installer manifest as seen by the mapping engine.
///
/// The engine never parses or writes a manifest itself; it resolves ids,
/// records bindings and asks for new entries through this trait.
pub trait Manifest {
    /// Id for an artifact, either recorded earlier or derived by convention.
    /// Fails when the id already belongs to, or is explicitly bound by, a
    /// different target name.
    fn file_id(&mut self, target_name: &str) -> Result<FileId, MappingError>;

    fn find_entry(&self, id: &FileId) -> Option<ManifestEntry>;

    /// Record that `target_name` is now provided by `entry`.
    fn map_file(&mut self, target_name: &str, entry: &ManifestEntry) -> Result<(), MappingError>;

    fn unmap_file(&mut self, target_name: &str);

    /// Is the mapping bound through the naming convention rather than an
    /// explicit choice? Such bindings are implied by the manifest structure.
    fn has_default_file_id(&self, mapping: &FileMapping) -> bool;

    /// Declare a new entry for an artifact that has no candidate.
    fn add_file_node(&mut self, mapping: &FileMapping) -> Result<ManifestEntry, MappingError>;

    fn file_nodes(&self) -> Vec<ManifestEntry>;

    /// Entry declared by some other party (an edit of the manifest outside
    /// the mapping engine).
    fn declare(&mut self, entry: ManifestEntry) -> Result<(), MappingError>;

    fn retract(&mut self, id: &FileId) -> Option<ManifestEntry>;
}

/// Id a target name gets when nobody chose one: every character outside
/// `[A-Za-z0-9_.]` becomes `_`, and a leading `_` is added unless the id
/// already starts with a letter or `_`.
pub fn default_file_id(target_name: &str) -> FileId {
    let mut id: String = target_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect();

    let starts_ok = id
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok {
        id.insert(0, '_');
    }
    FileId(id)
}

#[derive(Debug, Default)]
pub struct InMemoryManifest {
    entries: Vec<ManifestEntry>,
    //target name -> entry id, explicit choices only
    explicit: BTreeMap<String, FileId>,
    //id -> target name it was handed out for
    allocated: BTreeMap<FileId, String>,
}

impl InMemoryManifest {
    pub fn new(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        InMemoryManifest {
            entries: entries.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Pre-record an explicit mapping, as loaded from an existing project.
    pub fn with_mapping(mut self, target_name: impl Into<String>, id: impl Into<String>) -> Self {
        self.explicit.insert(target_name.into(), FileId::new(id));
        self
    }

    pub fn shared(self) -> Rc<RefCell<InMemoryManifest>> {
        Rc::new(RefCell::new(self))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn explicit_mapping(&self, target_name: &str) -> Option<&FileId> {
        self.explicit.get(target_name)
    }

    //the mapping's own id, or the first `<id>_<n>` nobody declared or claimed yet
    fn free_id_for(&self, id: &FileId, target_name: &str) -> FileId {
        let taken = |candidate: &FileId| {
            self.find_entry(candidate).is_some()
                || self.allocated.get(candidate).is_some_and(|t| t != target_name)
        };
        if !taken(id) {
            return id.clone();
        }
        (1..)
            .map(|n| FileId(format!("{}_{n}", id.as_str())))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| id.clone())
    }

    fn bound_target_of(&self, id: &FileId) -> Option<&str> {
        self.explicit
            .iter()
            .find(|(_, v)| *v == id)
            .map(|(k, _)| k.as_str())
    }
}

impl Manifest for InMemoryManifest {
    fn file_id(&mut self, target_name: &str) -> Result<FileId, MappingError> {
        let id = self
            .explicit
            .get(target_name)
            .cloned()
            .unwrap_or_else(|| default_file_id(target_name));

        //an entry explicitly bound to another target is not up for grabs by convention
        if let Some(holder) = self.bound_target_of(&id).filter(|t| *t != target_name) {
            return Err(MappingError::IdCollision {
                id,
                existing: holder.to_string(),
                requested: target_name.to_string(),
            });
        }

        match self.allocated.get(&id) {
            Some(existing) if existing != target_name => Err(MappingError::IdCollision {
                id,
                existing: existing.clone(),
                requested: target_name.to_string(),
            }),
            Some(_) => Ok(id),
            None => {
                self.allocated.insert(id.clone(), target_name.to_string());
                Ok(id)
            }
        }
    }

    fn find_entry(&self, id: &FileId) -> Option<ManifestEntry> {
        self.entries.iter().find(|e| &e.id == id).cloned()
    }

    fn map_file(&mut self, target_name: &str, entry: &ManifestEntry) -> Result<(), MappingError> {
        if self.find_entry(&entry.id).is_none() {
            return Err(MappingError::EntryNotFound(entry.id.clone()));
        }
        if let Some(other) = self.bound_target_of(&entry.id) {
            if other != target_name {
                return Err(MappingError::EntryAlreadyBound {
                    id: entry.id.clone(),
                    bound_to: other.to_string(),
                });
            }
        }

        self.explicit.insert(target_name.to_string(), entry.id.clone());
        Ok(())
    }

    fn unmap_file(&mut self, target_name: &str) {
        self.explicit.remove(target_name);
    }

    fn has_default_file_id(&self, mapping: &FileMapping) -> bool {
        mapping
            .mapped_node()
            .is_some_and(|node| node.id == default_file_id(mapping.target_name()))
    }

    fn add_file_node(&mut self, mapping: &FileMapping) -> Result<ManifestEntry, MappingError> {
        let id = self.free_id_for(mapping.id(), mapping.target_name());
        self.allocated.insert(id.clone(), mapping.target_name().to_string());

        let entry = ManifestEntry {
            id,
            name: mapping.display_name().to_string(),
            source: mapping.source_name().to_string(),
        };
        debug!(entry = %entry.id, name = %entry.name, "declared file entry");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn file_nodes(&self) -> Vec<ManifestEntry> {
        self.entries.clone()
    }

    fn declare(&mut self, entry: ManifestEntry) -> Result<(), MappingError> {
        if let Some(existing) = self.find_entry(&entry.id) {
            return Err(MappingError::IdCollision {
                id: entry.id,
                existing: existing.name,
                requested: entry.name,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    fn retract(&mut self, id: &FileId) -> Option<ManifestEntry> {
        let pos = self.entries.iter().position(|e| &e.id == id)?;
        self.explicit.retain(|_, v| v != id);
        Some(self.entries.remove(pos))
    }
}
