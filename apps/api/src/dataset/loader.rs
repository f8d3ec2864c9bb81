use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dataset::models::{JobPosting, Loaded, RecordId, ResumeRecord, RowWarning};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("{table} table is missing required column(s): {}", missing.join(", "))]
    Schema {
        table: &'static str,
        missing: Vec<String>,
    },
}

/// Column layout of one tabular source. Header matching ignores case and
/// surrounding whitespace.
struct TableSchema {
    name: &'static str,
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

const JOBS_SCHEMA: TableSchema = TableSchema {
    name: "jobs",
    required: &[
        "job_id",
        "category",
        "job_title",
        "job_description",
        "skills_required",
    ],
    optional: &["company", "location", "experience"],
};

const RESUMES_SCHEMA: TableSchema = TableSchema {
    name: "resumes",
    required: &["ID", "Resume_str", "Category"],
    optional: &["Resume_html"],
};

/// Header name → column index for one loaded table.
struct ColumnMap {
    names: Vec<&'static str>,
    indices: Vec<Option<usize>>,
}

impl ColumnMap {
    fn resolve(schema: &TableSchema, headers: &StringRecord) -> Result<Self, DatasetError> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        };

        let missing: Vec<String> = schema
            .required
            .iter()
            .filter(|col| find(col).is_none())
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::Schema {
                table: schema.name,
                missing,
            });
        }

        let names: Vec<&'static str> = schema
            .required
            .iter()
            .chain(schema.optional.iter())
            .copied()
            .collect();
        let indices = names.iter().map(|name| find(name)).collect();
        Ok(Self { names, indices })
    }

    /// Trimmed field value; absent columns and short records read as "".
    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.names
            .iter()
            .position(|name| *name == column)
            .and_then(|slot| self.indices[slot])
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }

    fn get_opt(&self, record: &StringRecord, column: &str) -> Option<String> {
        let value = self.get(record, column);
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Loads the job-postings table. A missing required column fails the whole
/// load; individual bad rows are skipped and reported.
pub fn load_jobs(path: &Path) -> Result<Loaded<JobPosting>, DatasetError> {
    let loaded = read_table(open(path)?, &JOBS_SCHEMA, |cols, record| {
        let id = cols.get(record, "job_id");
        if id.is_empty() {
            return Err("missing job_id".to_string());
        }
        let job = JobPosting {
            id: RecordId::new(id),
            category: cols.get(record, "category").to_string(),
            title: cols.get(record, "job_title").to_string(),
            description: cols.get(record, "job_description").to_string(),
            skills: cols.get(record, "skills_required").to_string(),
            company: cols.get_opt(record, "company"),
            location: cols.get_opt(record, "location"),
            experience: cols.get_opt(record, "experience"),
        };
        if job.canonical_text().is_empty() {
            return Err(format!("job {id} has no title, description or skills"));
        }
        Ok(job)
    })?;

    info!(
        path = %path.display(),
        rows = loaded.rows.len(),
        skipped = loaded.skipped,
        "Loaded jobs table"
    );
    Ok(loaded)
}

/// Loads the resumes table used for key-based text lookup.
pub fn load_resumes(path: &Path) -> Result<Loaded<ResumeRecord>, DatasetError> {
    let loaded = read_table(open(path)?, &RESUMES_SCHEMA, |cols, record| {
        let id = cols.get(record, "ID");
        if id.is_empty() {
            return Err("missing ID".to_string());
        }
        let text = cols.get(record, "Resume_str");
        if text.is_empty() {
            return Err(format!("resume {id} has empty Resume_str"));
        }
        Ok(ResumeRecord {
            id: RecordId::new(id),
            text: text.to_string(),
            html: cols.get_opt(record, "Resume_html"),
            category: cols.get(record, "Category").to_string(),
        })
    })?;

    info!(
        path = %path.display(),
        rows = loaded.rows.len(),
        skipped = loaded.skipped,
        "Loaded resumes table"
    );
    Ok(loaded)
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
        _ => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn read_table<R, T, F>(
    source: R,
    schema: &TableSchema,
    parse_row: F,
) -> Result<Loaded<T>, DatasetError>
where
    R: Read,
    F: Fn(&ColumnMap, &StringRecord) -> Result<T, String>,
{
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(schema, &headers)?;

    let mut loaded = Loaded::empty();
    loaded.columns = headers.iter().map(|h| h.trim().to_string()).collect();

    for result in reader.records() {
        let (line, outcome) = match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                (line, parse_row(&columns, &record))
            }
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(0);
                (line, Err(format!("unparseable record: {err}")))
            }
        };

        match outcome {
            Ok(row) => loaded.rows.push(row),
            Err(reason) => {
                debug!(table = schema.name, line, %reason, "Skipping row");
                loaded.skipped += 1;
                loaded.warnings.push(RowWarning { line, reason });
            }
        }
    }

    if loaded.skipped > 0 {
        warn!(
            table = schema.name,
            skipped = loaded.skipped,
            "Some rows were excluded during load"
        );
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const JOBS_HEADER: &str = "job_id,category,job_title,job_description,skills_required,company\n";

    #[test]
    fn test_load_jobs_preserves_row_order() {
        let file = csv_file(&format!(
            "{JOBS_HEADER}\
             2,Engineering,Backend Engineer,Build services,\"rust, sql\",Acme\n\
             1,Design,Product Designer,Design flows,figma,\n"
        ));

        let loaded = load_jobs(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].id.as_str(), "2");
        assert_eq!(loaded.rows[0].skills, "rust, sql");
        assert_eq!(loaded.rows[0].company.as_deref(), Some("Acme"));
        assert_eq!(loaded.rows[1].id.as_str(), "1");
        assert_eq!(loaded.rows[1].company, None);
        assert_eq!(loaded.skipped, 0);
    }

    #[test]
    fn test_load_jobs_missing_skills_column_is_schema_error() {
        let file = csv_file(
            "job_id,category,job_title,job_description\n1,Engineering,Engineer,Build\n",
        );

        let err = load_jobs(file.path()).unwrap_err();
        match err {
            DatasetError::Schema { table, missing } => {
                assert_eq!(table, "jobs");
                assert_eq!(missing, vec!["skills_required".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_jobs_headers_are_case_insensitive() {
        let file = csv_file(
            "Job_ID, Category ,JOB_TITLE,Job_Description,Skills_Required\n1,Eng,Engineer,Build,rust\n",
        );

        let loaded = load_jobs(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].title, "Engineer");
    }

    #[test]
    fn test_load_jobs_skips_rows_without_id_or_text() {
        let file = csv_file(&format!(
            "{JOBS_HEADER}\
             ,Engineering,Engineer,Build,rust,\n\
             5,Engineering,,,,\n\
             6,Engineering,Engineer,Build,rust,\n"
        ));

        let loaded = load_jobs(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].id.as_str(), "6");
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.warnings[0].line, 2);
        assert!(loaded.warnings[1].reason.contains("job 5"));
    }

    #[test]
    fn test_load_jobs_short_record_reads_missing_fields_as_empty() {
        let file = csv_file(&format!("{JOBS_HEADER}7,Engineering,Engineer\n"));

        let loaded = load_jobs(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].description, "");
        assert_eq!(loaded.rows[0].canonical_text(), "Engineer");
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = load_jobs(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn test_load_resumes_reads_optional_html() {
        let file = csv_file(
            "ID,Resume_str,Resume_html,Category\n\
             R1,Python developer with 5 years,<p>cv</p>,IT\n\
             R2,Accountant,,Finance\n\
             R3,,,Finance\n",
        );

        let loaded = load_resumes(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].html.as_deref(), Some("<p>cv</p>"));
        assert_eq!(loaded.rows[1].html, None);
        assert_eq!(loaded.skipped, 1);
        assert_eq!(loaded.columns, vec!["ID", "Resume_str", "Resume_html", "Category"]);
    }

    #[test]
    fn test_load_resumes_without_html_column() {
        let file = csv_file("ID,Resume_str,Category\nR1,Nurse,Healthcare\n");

        let loaded = load_resumes(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].category, "Healthcare");
    }
}
