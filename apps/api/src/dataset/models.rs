use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier shared by the jobs and resumes tables.
///
/// Ordering is natural rather than purely lexicographic: all-digit identifiers
/// compare by value (`"2" < "10"`) and sort before any other identifier, which
/// compare as plain strings. This is the tie-break order for equal scores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u128> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the job-postings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: RecordId,
    pub category: String,
    pub title: String,
    pub description: String,
    pub skills: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
}

impl JobPosting {
    /// The text that gets embedded: title, description, skills, in that order.
    /// Reordering these fields changes every embedding in the index.
    pub fn canonical_text(&self) -> String {
        [&self.title, &self.description, &self.skills]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Human-readable description. Postings without a description get one
    /// assembled from their structured fields.
    pub fn display_description(&self) -> String {
        if !self.description.is_empty() {
            return self.description.clone();
        }

        let mut parts = Vec::new();
        if let Some(location) = self.location.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Location: {location}"));
        }
        if let Some(experience) = self.experience.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Experience: {experience}"));
        }
        if !self.skills.is_empty() {
            parts.push(format!("Skills: {}", self.skills));
        }
        if !self.category.is_empty() {
            parts.push(format!("Category: {}", self.category));
        }
        parts.join(" | ")
    }
}

/// One row of the resumes table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: RecordId,
    pub text: String,
    pub html: Option<String>,
    pub category: String,
}

/// A row that was excluded from a load, with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowWarning {
    pub line: u64,
    pub reason: String,
}

/// Output of a table load: the accepted rows in source order plus the skip tally.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub columns: Vec<String>,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
}

impl<T> Loaded<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            skipped: 0,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, description: &str, skills: &str) -> JobPosting {
        JobPosting {
            id: RecordId::new("1"),
            category: "Engineering".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            skills: skills.to_string(),
            company: None,
            location: Some("Remote".to_string()),
            experience: None,
        }
    }

    #[test]
    fn test_numeric_ids_sort_by_value() {
        let mut ids = vec![RecordId::new("10"), RecordId::new("2"), RecordId::new("1")];
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(sorted, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_numeric_ids_sort_before_text_ids() {
        let mut ids = vec![
            RecordId::new("job-b"),
            RecordId::new("7"),
            RecordId::new("job-a"),
        ];
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(sorted, vec!["7", "job-a", "job-b"]);
    }

    #[test]
    fn test_leading_zero_ids_are_distinct_but_adjacent() {
        let a = RecordId::new("007");
        let b = RecordId::new("7");
        assert_ne!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Less);
    }

    #[test]
    fn test_canonical_text_field_order() {
        let posting = job("Backend Engineer", "Build APIs", "rust, sql");
        assert_eq!(posting.canonical_text(), "Backend Engineer Build APIs rust, sql");
    }

    #[test]
    fn test_canonical_text_skips_empty_parts() {
        let posting = job("Backend Engineer", "", "rust");
        assert_eq!(posting.canonical_text(), "Backend Engineer rust");
    }

    #[test]
    fn test_display_description_falls_back_to_fields() {
        let posting = job("Backend Engineer", "", "rust");
        assert_eq!(
            posting.display_description(),
            "Location: Remote | Skills: rust | Category: Engineering"
        );
    }
}
