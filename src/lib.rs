//! Live reconciliation between project build outputs and the file entries
//! declared in an installer manifest.
//!
//! Every output gets a [`FileMapping`] that is either bound to a manifest
//! entry or classified by how many unmapped entries share its file name.
//! Bindings move entries in and out of two shared registries, and every
//! registry change is pushed synchronously into every mapping that watches
//! it.

pub mod core;
pub mod mapping;

pub use crate::core::error::MappingError;
pub use crate::core::mapping::FileMapping;
pub use crate::core::registry::Registry;
pub use crate::core::session::MappingSession;
pub use crate::core::state::MappingState;
pub use crate::core::types::{Artifact, FileId, ManifestEntry, UnmappedFile};
pub use crate::mapping::generator::SessionSpec;
pub use crate::mapping::manifest::{InMemoryManifest, Manifest, SharedManifest};
pub use crate::mapping::report::MappingReport;
