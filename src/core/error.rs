use thiserror::Error;

use crate::core::types::FileId;

/// Faults that break the session's consistency. A gated operation whose
/// precondition is false is not an error; it reports `Ok(false)`.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("file id {id} is already allocated to {existing}, requested for {requested}")]
    IdCollision {
        id: FileId,
        existing: String,
        requested: String,
    },

    #[error("manifest entry {0} is not in the unmapped registry")]
    TargetNotUnmapped(FileId),

    #[error("manifest entry {id} is already bound to {bound_to}")]
    EntryAlreadyBound { id: FileId, bound_to: String },

    #[error("manifest entry {0} not found")]
    EntryNotFound(FileId),

    #[error("artifact {0} has no mapping in this session")]
    UnknownArtifact(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("failed to read session input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed TOON: {0}")]
    Toon(#[from] toon_format::ToonError),
}
