// Dataset ingestion: CSV job postings and resumes into typed, validated rows.

pub mod loader;
pub mod models;

use std::collections::HashMap;

pub use loader::{load_jobs, load_resumes, DatasetError};
pub use models::{JobPosting, Loaded, RecordId, ResumeRecord, RowWarning};

/// Loaded resumes indexed by identifier for key-based text lookup.
/// Duplicate identifiers resolve to the last row in the source.
#[derive(Debug, Clone)]
pub struct ResumeTable {
    loaded: Loaded<ResumeRecord>,
    by_id: HashMap<RecordId, usize>,
}

impl ResumeTable {
    pub fn new(loaded: Loaded<ResumeRecord>) -> Self {
        let by_id = loaded
            .rows
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id.clone(), pos))
            .collect();
        Self { loaded, by_id }
    }

    pub fn empty() -> Self {
        Self::new(Loaded::empty())
    }

    pub fn get(&self, key: &str) -> Option<&ResumeRecord> {
        self.by_id
            .get(&RecordId::new(key.trim()))
            .map(|&pos| &self.loaded.rows[pos])
    }

    pub fn loaded(&self) -> &Loaded<ResumeRecord> {
        &self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume(id: &str, text: &str) -> ResumeRecord {
        ResumeRecord {
            id: RecordId::new(id),
            text: text.to_string(),
            html: None,
            category: "IT".to_string(),
        }
    }

    #[test]
    fn test_lookup_trims_key() {
        let mut loaded = Loaded::empty();
        loaded.rows.push(resume("R100", "python developer"));
        let table = ResumeTable::new(loaded);

        assert_eq!(table.get("  R100 ").map(|r| r.text.as_str()), Some("python developer"));
        assert!(table.get("R1").is_none());
    }

    #[test]
    fn test_duplicate_ids_last_row_wins() {
        let mut loaded = Loaded::empty();
        loaded.rows.push(resume("R1", "first"));
        loaded.rows.push(resume("R1", "second"));
        let table = ResumeTable::new(loaded);

        assert_eq!(table.loaded().rows.len(), 2);
        assert_eq!(table.get("R1").map(|r| r.text.as_str()), Some("second"));
    }
}
