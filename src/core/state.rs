// mapping states
use serde::{Deserialize, Serialize};

/// How well an artifact is matched against the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingState {
    /// bound to a manifest entry
    Resolved,
    /// exactly one free entry carries the name and no other artifact competes for it
    Unique,
    /// several free entries, or several artifacts competing for one
    Ambiguous,
    /// no free entry carries the name
    Unmapped,
}

impl MappingState {
    pub const ALL: [MappingState; 4] = [
        MappingState::Resolved,
        MappingState::Unique,
        MappingState::Ambiguous,
        MappingState::Unmapped,
    ];

    /// Derive the state from the binding and the sizes of both candidate views.
    ///
    /// `contenders` counts the unmapped artifacts sharing the display name,
    /// including the artifact itself while it is unbound. A single free entry
    /// is only `Unique` when nobody else contends for it.
    pub fn derive(is_bound: bool, candidates: usize, contenders: usize) -> Self {
        if is_bound {
            return MappingState::Resolved;
        }

        match (candidates, contenders) {
            (0, _) => MappingState::Unmapped,
            (1, 1) => MappingState::Unique,
            _ => MappingState::Ambiguous,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, MappingState::Resolved)
    }

    //states that still need a decision from the user
    pub fn needs_attention(self) -> bool {
        matches!(self, MappingState::Ambiguous | MappingState::Unmapped)
    }
}
