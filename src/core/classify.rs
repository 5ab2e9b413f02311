// classification queries over a whole session
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::core::error::MappingError;
use crate::core::mapping::FileMapping;
use crate::core::session::MappingSession;
use crate::core::state::MappingState;
use crate::core::types::FileId;

/// Number of mappings in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub resolved: usize,
    pub unique: usize,
    pub ambiguous: usize,
    pub unmapped: usize,
}

impl StateSummary {
    pub fn get(&self, state: MappingState) -> usize {
        match state {
            MappingState::Resolved => self.resolved,
            MappingState::Unique => self.unique,
            MappingState::Ambiguous => self.ambiguous,
            MappingState::Unmapped => self.unmapped,
        }
    }

    pub fn total(&self) -> usize {
        self.resolved + self.unique + self.ambiguous + self.unmapped
    }
}

impl MappingSession {
    pub fn count(&self, state: MappingState) -> usize {
        self.mappings.iter().filter(|m| m.state() == state).count()
    }

    pub fn summary(&self) -> StateSummary {
        let mut s = StateSummary::default();
        for m in &self.mappings {
            match m.state() {
                MappingState::Resolved => s.resolved += 1,
                MappingState::Unique => s.unique += 1,
                MappingState::Ambiguous => s.ambiguous += 1,
                MappingState::Unmapped => s.unmapped += 1,
            }
        }
        s
    }

    pub fn mappings_in(&self, state: MappingState) -> Vec<Rc<FileMapping>> {
        self.mappings
            .iter()
            .filter(|m| m.state() == state)
            .cloned()
            .collect()
    }

    /// Resolve every `Unique` mapping.
    ///
    /// Each resolution can change other mappings' states, so the set is
    /// re-read after every step instead of being collected up front.
    pub fn resolve_all_unique(&self) -> Result<usize, MappingError> {
        let mut resolved = 0;
        while let Some(next) = self
            .mappings
            .iter()
            .find(|m| m.state() == MappingState::Unique && m.can_resolve_file())
            .cloned()
        {
            if !next.resolve_file()? {
                break;
            }
            resolved += 1;
        }
        debug!(resolved, "resolved unique mappings");
        Ok(resolved)
    }

    /// Check the cross-mapping consistency rules and report the first breach.
    pub fn check_invariants(&self) -> Result<(), MappingError> {
        let mut owners: HashMap<&FileId, &str> = HashMap::new();
        let bound: Vec<_> = self
            .mappings
            .iter()
            .map(|m| (m, m.mapped_node()))
            .collect();

        for (m, node) in &bound {
            if let Some(node) = node {
                if let Some(other) = owners.insert(&node.id, m.target_name()) {
                    return Err(MappingError::InvariantViolation(format!(
                        "entry {} bound by both {} and {}",
                        node.id,
                        other,
                        m.target_name()
                    )));
                }
            }
        }

        let free = self.unmapped_files.snapshot();
        for (i, f) in free.iter().enumerate() {
            if let Some(owner) = owners.get(&f.node.id) {
                return Err(MappingError::InvariantViolation(format!(
                    "entry {} is unmapped but bound by {}",
                    f.node.id, owner
                )));
            }
            if free[..i].iter().any(|g| g.node.id == f.node.id) {
                return Err(MappingError::InvariantViolation(format!(
                    "entry {} listed twice as unmapped",
                    f.node.id
                )));
            }
        }

        let waiting = self.unmapped_artifacts.snapshot();
        for (m, node) in &bound {
            let listed = waiting.iter().filter(|a| *a == m.artifact()).count();
            let expected = usize::from(node.is_none());
            if listed != expected {
                return Err(MappingError::InvariantViolation(format!(
                    "artifact {} listed {} times as unmapped, expected {}",
                    m.target_name(),
                    listed,
                    expected
                )));
            }

            let derived = MappingState::derive(node.is_some(), m.unmapped_nodes().len(), m.contenders());
            if derived != m.state() {
                return Err(MappingError::InvariantViolation(format!(
                    "{} is {:?} but derives to {:?}",
                    m.target_name(),
                    m.state(),
                    derived
                )));
            }
        }

        Ok(())
    }
}
