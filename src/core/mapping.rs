// one artifact <-> at most one manifest entry
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::core::error::MappingError;
use crate::core::filter::{NamedFilter, ViewChanged};
use crate::core::notify::{Callback, Listeners};
use crate::core::registry::Registry;
use crate::core::state::MappingState;
use crate::core::types::{Artifact, FileId, ManifestEntry, UnmappedFile};
use crate::mapping::manifest::SharedManifest;

/// Binds one artifact to zero or one manifest entries and keeps its
/// [`MappingState`] in sync with the shared unmapped registries.
///
/// Rules:
/// 1. A bound entry is never in the unmapped file registry.
/// 2. The artifact is in the unmapped artifact registry iff it is unbound.
/// 3. The state is recomputed from the binding and both candidate views,
///    never set directly.
///
/// The gated operations return `Ok(false)` when their precondition does not
/// hold, so they can be fired at a whole selection.
pub struct FileMapping {
    artifact: Artifact,
    id: FileId,
    manifest: SharedManifest,
    all_unmapped_artifacts: Registry<Artifact>,
    all_unmapped_files: Registry<UnmappedFile>,
    unmapped_artifacts: NamedFilter<Artifact>,
    unmapped_files: NamedFilter<UnmappedFile>,
    mapped_node: RefCell<Option<ManifestEntry>>,
    state: Cell<MappingState>,
    listeners: Listeners<MappingState>,
    _on_view_changed: Callback<ViewChanged>,
}

impl FileMapping {
    /// Build the mapping and bind it by convention when the manifest already
    /// has an entry with its id.
    ///
    /// The registries are left alone: the caller removes a convention-bound
    /// entry from `all_unmapped_files` and adds an unbound artifact to
    /// `all_unmapped_artifacts`, as [`MappingSession`] does.
    ///
    /// [`MappingSession`]: crate::core::session::MappingSession
    pub(crate) fn new(
        artifact: Artifact,
        all_unmapped_artifacts: &Registry<Artifact>,
        manifest: &SharedManifest,
        all_unmapped_files: &Registry<UnmappedFile>,
    ) -> Result<Rc<FileMapping>, MappingError> {
        let id = manifest.borrow_mut().file_id(&artifact.target_name)?;
        //recognised by convention: the manifest already has an entry with our id
        let mapped_node = manifest.borrow().find_entry(&id);

        let mapping = Rc::new_cyclic(|weak: &Weak<FileMapping>| {
            let unmapped_artifacts = NamedFilter::by_name(all_unmapped_artifacts, &artifact.display_name);
            let unmapped_files = NamedFilter::by_name(all_unmapped_files, &artifact.display_name);

            let weak = weak.clone();
            let on_view_changed: Callback<ViewChanged> = Rc::new(move |_: &ViewChanged| {
                if let Some(mapping) = weak.upgrade() {
                    mapping.update_mapping_state();
                }
            });
            unmapped_artifacts.subscribe(&on_view_changed);
            unmapped_files.subscribe(&on_view_changed);

            let state = MappingState::derive(mapped_node.is_some(), unmapped_files.len(), unmapped_artifacts.len());

            FileMapping {
                artifact,
                id,
                manifest: Rc::clone(manifest),
                all_unmapped_artifacts: all_unmapped_artifacts.clone(),
                all_unmapped_files: all_unmapped_files.clone(),
                unmapped_artifacts,
                unmapped_files,
                mapped_node: RefCell::new(mapped_node),
                state: Cell::new(state),
                listeners: Listeners::new(),
                _on_view_changed: on_view_changed,
            }
        });

        trace!(artifact = %mapping.target_name(), state = ?mapping.state(), "mapping created");
        Ok(mapping)
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn display_name(&self) -> &str {
        &self.artifact.display_name
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn unique_name(&self) -> &str {
        &self.artifact.target_name
    }

    pub fn extension(&self) -> &str {
        self.artifact.extension()
    }

    pub fn target_name(&self) -> &str {
        &self.artifact.target_name
    }

    pub fn source_name(&self) -> &str {
        &self.artifact.source_name
    }

    pub fn project(&self) -> &str {
        &self.artifact.project
    }

    /// Free manifest entries carrying this artifact's file name, copied at
    /// the time of the call. Use [`candidates`](Self::candidates) to follow
    /// the list as it changes.
    pub fn unmapped_nodes(&self) -> Vec<UnmappedFile> {
        self.unmapped_files.items()
    }

    /// Live view of the free manifest entries carrying this artifact's file name.
    pub fn candidates(&self) -> &NamedFilter<UnmappedFile> {
        &self.unmapped_files
    }

    /// Unbound artifacts (this one included while unbound) sharing the file name.
    pub fn contenders(&self) -> usize {
        self.unmapped_artifacts.len()
    }

    pub fn mapped_node(&self) -> Option<ManifestEntry> {
        self.mapped_node.borrow().clone()
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_node.borrow().is_some()
    }

    pub fn state(&self) -> MappingState {
        self.state.get()
    }

    /// Called with the new state whenever it actually changes.
    pub fn subscribe(&self, callback: &Callback<MappingState>) {
        self.listeners.subscribe(callback);
    }

    /// Bind to `entry`, releasing any previous binding first.
    ///
    /// The entry must currently be free. Binding to the entry already bound
    /// is a no-op.
    pub fn map_to(&self, entry: ManifestEntry) -> Result<bool, MappingError> {
        if self.mapped_node.borrow().as_ref() == Some(&entry) {
            return Ok(false);
        }
        self.set_mapped_node(Some(entry), true)?;
        Ok(true)
    }

    pub fn can_add_file(&self) -> bool {
        !self.is_mapped() && self.unmapped_files.is_empty()
    }

    /// Declare a new manifest entry for this artifact and bind to it.
    pub fn add_file(&self) -> Result<bool, MappingError> {
        if !self.can_add_file() {
            return Ok(false);
        }

        let node = self.manifest.borrow_mut().add_file_node(self)?;
        debug!(artifact = %self.target_name(), entry = %node.id, "adding file");
        self.set_mapped_node(Some(node), false)?;
        Ok(true)
    }

    pub fn can_clear_mapping(&self) -> bool {
        self.is_mapped() && !self.manifest.borrow().has_default_file_id(self)
    }

    pub fn clear_mapping(&self) -> Result<bool, MappingError> {
        if !self.can_clear_mapping() {
            return Ok(false);
        }
        self.set_mapped_node(None, false)?;
        Ok(true)
    }

    pub fn can_resolve_file(&self) -> bool {
        !self.is_mapped() && self.unmapped_files.len() == 1
    }

    /// Bind to the single free entry carrying this artifact's name.
    pub fn resolve_file(&self) -> Result<bool, MappingError> {
        if !self.can_resolve_file() {
            return Ok(false);
        }
        let Some(candidate) = self.unmapped_files.first() else {
            return Ok(false);
        };
        self.set_mapped_node(Some(candidate.node), true)?;
        Ok(true)
    }

    /// Drop the binding regardless of how it came about. Used when the bound
    /// entry itself leaves the manifest.
    pub(crate) fn release(&self) -> Result<bool, MappingError> {
        if !self.is_mapped() {
            return Ok(false);
        }
        self.set_mapped_node(None, false)?;
        Ok(true)
    }

    // The one place where the binding changes.
    // While the registries move, the binding field already holds whatever the
    // mapping ends up bound to (or still the old entry when unbinding), so
    // the recomputes fired from inside never report a transient state.
    fn set_mapped_node(&self, new_node: Option<ManifestEntry>, require_unmapped: bool) -> Result<(), MappingError> {
        //prefer the registry's copy, it is what the manifest declared
        let new_node = match new_node {
            Some(node) => match self.all_unmapped_files.collect_where(|f| f.node == node).into_iter().next() {
                Some(free) => Some(free.node),
                None if require_unmapped => return Err(MappingError::TargetNotUnmapped(node.id)),
                None => Some(node),
            },
            None => None,
        };

        let old_node = self.mapped_node.borrow().clone();

        if let Some(old) = old_node {
            debug!(artifact = %self.target_name(), entry = %old.id, "unmapping file");
            self.all_unmapped_files.add(UnmappedFile::new(old));
            self.manifest.borrow_mut().unmap_file(self.target_name());
            if !self.all_unmapped_artifacts.contains(&self.artifact) {
                self.all_unmapped_artifacts.add(self.artifact.clone());
            }
        }

        match new_node {
            Some(new) => {
                debug!(artifact = %self.target_name(), entry = %new.id, "mapping file");
                self.manifest.borrow_mut().map_file(self.target_name(), &new)?;
                *self.mapped_node.borrow_mut() = Some(new.clone());
                self.all_unmapped_files.remove_where(|f| f.node == new);
                self.all_unmapped_artifacts.remove(&self.artifact);
            }
            None => {
                *self.mapped_node.borrow_mut() = None;
            }
        }

        self.update_mapping_state();
        Ok(())
    }

    //pure w.r.t. the registries, safe to run from inside another mapping's transition
    fn update_mapping_state(&self) {
        let next = MappingState::derive(self.is_mapped(), self.unmapped_files.len(), self.unmapped_artifacts.len());
        let prev = self.state.replace(next);
        if prev != next {
            trace!(artifact = %self.target_name(), ?prev, ?next, "mapping state changed");
            self.listeners.notify(&next);
        }
    }
}

impl fmt::Debug for FileMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMapping")
            .field("target_name", &self.artifact.target_name)
            .field("id", &self.id)
            .field("mapped_node", &self.mapped_node.borrow().as_ref().map(|n| &n.id))
            .field("state", &self.state.get())
            .finish()
    }
}
