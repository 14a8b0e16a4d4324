//! Report rows and the CSV writer.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::coverage::{covered_text, length_code};
use super::{ReportError, ReportResult};
use crate::artifacts::ArtifactStore;
use crate::cases::TestCase;
use crate::classify::classify_with_tokens;

/// Raw OS error codes reported for a file held open by another program
const LOCKED_OS_ERRORS: &[i32] = &[16, 32, 33];

/// Column headers, in the order [`ReportRow`] serializes them
pub const REPORT_HEADERS: [&str; 9] = [
    "TC id",
    "Test case name",
    "Input length type",
    "Input",
    "Expected",
    "Actual output",
    "Status",
    "Accuracy justification / Description",
    "What is covered by the test",
];

/// One spreadsheet row; field names are the column headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "TC id")]
    pub id: String,
    #[serde(rename = "Test case name")]
    pub name: String,
    #[serde(rename = "Input length type")]
    pub input_length_type: String,
    #[serde(rename = "Input")]
    pub input: String,
    #[serde(rename = "Expected")]
    pub expected: String,
    #[serde(rename = "Actual output")]
    pub actual: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Accuracy justification / Description")]
    pub justification: String,
    #[serde(rename = "What is covered by the test")]
    pub covered: String,
}

/// Rows plus how many cases had no observed output to fall back on
#[derive(Debug, Clone, Default)]
pub struct ReportRows {
    pub rows: Vec<ReportRow>,
    pub missing_observed: usize,
}

/// Join cases with their observed outputs
pub fn build_rows(cases: &[TestCase], artifacts: &ArtifactStore) -> ReportResult<ReportRows> {
    let mut report = ReportRows::default();

    for case in cases {
        let actual = match case.stored_actual() {
            Some(actual) => actual.to_string(),
            None => match artifacts
                .read_observed(&case.id)
                .map_err(|source| ReportError::Io {
                    path: artifacts.observed_path(&case.id),
                    source,
                })? {
                Some(text) => text.trim().to_string(),
                None => {
                    report.missing_observed += 1;
                    String::new()
                }
            },
        };

        let status = case
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                classify_with_tokens(
                    &case.expected,
                    &actual,
                    &case.category,
                    case.expected_tokens.as_deref(),
                )
                .to_string()
            });

        report.rows.push(ReportRow {
            id: case.id.clone(),
            name: case.name.clone(),
            input_length_type: length_code(case),
            input: case.input.clone(),
            expected: case.expected.clone(),
            actual,
            status,
            justification: case.justification_text().to_string(),
            covered: covered_text(case),
        });
    }

    Ok(report)
}

/// Write `rows` to `path`, or to a timestamped sibling if `path` is locked.
///
/// Returns the path actually written.
pub fn write_rows(rows: &[ReportRow], path: &Path) -> ReportResult<PathBuf> {
    write_rows_with(rows, path, |p| File::create(p))
}

/// [`write_rows`] with the first attempt to open `path` supplied by the caller
fn write_rows_with<F>(rows: &[ReportRow], path: &Path, open: F) -> ReportResult<PathBuf>
where
    F: Fn(&Path) -> io::Result<File>,
{
    match open(path) {
        Ok(file) => {
            write_csv(rows, file)?;
            info!(path = %path.display(), rows = rows.len(), "report written");
            Ok(path.to_path_buf())
        }
        Err(err) if is_locked(&err) => {
            let fallback = fallback_path(path);
            warn!(
                path = %path.display(),
                fallback = %fallback.display(),
                "report file is locked, writing to fallback"
            );
            let file = File::create(&fallback).map_err(|source| ReportError::Io {
                path: fallback.clone(),
                source,
            })?;
            write_csv(rows, file)?;
            info!(path = %fallback.display(), rows = rows.len(), "report written");
            Ok(fallback)
        }
        Err(source) => Err(ReportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_csv(rows: &[ReportRow], file: File) -> ReportResult<()> {
    let mut writer = csv::Writer::from_writer(file);
    if rows.is_empty() {
        writer.write_record(REPORT_HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| ReportError::Csv(e.into()))?;
    Ok(())
}

fn is_locked(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .is_some_and(|code| LOCKED_OS_ERRORS.contains(&code))
}

/// `<stem>_<timestamp>.csv` next to `path`
pub fn fallback_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    path.with_file_name(format!("{}_{}.csv", stem, stamp))
}
