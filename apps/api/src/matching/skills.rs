//! Keyword skill extraction and resume/job skill overlap.
//!
//! Informational only. Ranking stays on cosine similarity; these values are
//! reported alongside each match so callers can see which skills lined up.

use std::collections::BTreeSet;

/// Tech terms recognised anywhere in free text.
pub const COMMON_SKILLS: &[&str] = &[
    "python", "java", "javascript", "typescript", "react", "angular", "vue", "node", "nodejs",
    "django", "flask", "fastapi", "spring", "express", "mongodb", "mysql", "postgresql", "sql",
    "docker", "kubernetes", "aws", "azure", "gcp", "jenkins", "git", "gitlab", "ci/cd",
    "html", "css", "bootstrap", "tailwind", "redux", "graphql", "rest", "api",
    "machine learning", "ml", "ai", "deep learning", "tensorflow", "pytorch", "pandas", "numpy",
    "agile", "scrum", "devops", "microservices", "cloud", "linux", "unix",
];

/// Job rows with no recognisable skills are neither a match nor a miss.
const NEUTRAL_OVERLAP: f32 = 0.5;

// Comma-separated entries outside this length range (in chars, exclusive)
// are noise: initials, stray punctuation or whole sentences.
const MIN_LISTED_SKILL_CHARS: usize = 2;
const MAX_LISTED_SKILL_CHARS: usize = 30;

/// Lower-cased skills found in `text`.
///
/// Two sources: every `COMMON_SKILLS` term that appears as a whole word or
/// phrase, and, when the text contains commas, each comma-separated entry.
pub fn extract_skills(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if text.trim().is_empty() {
        return found;
    }

    let lower = text.to_lowercase();
    for &term in COMMON_SKILLS {
        if contains_term(&lower, term) {
            found.insert(term.to_string());
        }
    }

    if lower.contains(',') {
        found.extend(
            lower
                .split(',')
                .map(str::trim)
                .filter(|part| {
                    let len = part.chars().count();
                    len > MIN_LISTED_SKILL_CHARS && len < MAX_LISTED_SKILL_CHARS
                })
                .map(str::to_string),
        );
    }

    found
}

/// Jaccard overlap of two skill sets in [0, 1].
///
/// A job with no skills scores `0.5`; a resume with no skills scores `0.0`.
pub fn skill_overlap(resume: &BTreeSet<String>, job: &BTreeSet<String>) -> f32 {
    if job.is_empty() {
        return NEUTRAL_OVERLAP;
    }
    if resume.is_empty() {
        return 0.0;
    }
    let shared = resume.intersection(job).count();
    let union = resume.union(job).count();
    shared as f32 / union as f32
}

/// Skills present in both sets, in sorted order.
pub fn matched_skills(resume: &BTreeSet<String>, job: &BTreeSet<String>) -> Vec<String> {
    resume.intersection(job).cloned().collect()
}

/// `term` occurs in `haystack` with no alphanumeric character on either side,
/// so "ai" does not match inside "maintain".
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
