// traceable snapshot of a session, for logs and review
use serde::Serialize;

use crate::core::classify::StateSummary;
use crate::core::error::MappingError;
use crate::core::session::MappingSession;
use crate::core::state::MappingState;
use crate::core::types::FileId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingRow {
    pub target_name: String,
    pub display_name: String,
    pub id: FileId,
    pub state: MappingState,
    pub entry: Option<FileId>,
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingReport {
    pub summary: StateSummary,
    pub rows: Vec<MappingRow>,
}

impl MappingReport {
    /// Rows are sorted by target name so reports diff cleanly.
    pub fn from_session(session: &MappingSession) -> Self {
        let mut rows: Vec<MappingRow> = session
            .mappings()
            .iter()
            .map(|m| MappingRow {
                target_name: m.target_name().to_string(),
                display_name: m.display_name().to_string(),
                id: m.id().clone(),
                state: m.state(),
                entry: m.mapped_node().map(|n| n.id),
                candidates: m.unmapped_nodes().len(),
            })
            .collect();
        rows.sort_by(|a, b| a.target_name.cmp(&b.target_name));

        MappingReport {
            summary: session.summary(),
            rows,
        }
    }

    pub fn rows_in(&self, state: MappingState) -> impl Iterator<Item = &MappingRow> + '_ {
        self.rows.iter().filter(move |r| r.state == state)
    }

    pub fn to_toon(&self) -> Result<String, MappingError> {
        Ok(toon_format::encode_default(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Artifact, ManifestEntry};
    use crate::mapping::manifest::InMemoryManifest;

    #[test]
    fn report_lists_every_mapping_sorted() {
        let manifest = InMemoryManifest::new([ManifestEntry::new("F_a", "a.dll", "")]).shared();
        let session = MappingSession::new(
            [Artifact::new("z/b.dll", "", "P"), Artifact::new("bin/a.dll", "", "P")],
            manifest,
        )
        .unwrap();
        session.resolve_files(["bin/a.dll"]).unwrap();

        let report = MappingReport::from_session(&session);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].target_name, "bin/a.dll");
        assert_eq!(report.rows[0].entry, Some(FileId::new("F_a")));
        assert_eq!(report.rows[1].state, MappingState::Unmapped);
        assert_eq!(report.summary.resolved, 1);
        assert_eq!(report.rows_in(MappingState::Unmapped).count(), 1);

        let text = report.to_toon().unwrap();
        assert!(text.contains("bin/a.dll"));
        assert!(text.contains("Resolved"));
    }
}
