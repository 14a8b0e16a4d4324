//! Report builder.
//!
//! Joins the stored cases with their observed outputs and writes one CSV row
//! per case, with a status column computed by the same classifier the runner
//! uses and descriptive columns inferred by [`coverage`].

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::cases::{CaseStore, StoreError};

pub mod coverage;
pub mod sheet;

pub use coverage::{LengthBucket, covered_text, length_code};
pub use sheet::{REPORT_HEADERS, ReportRow, ReportRows, build_rows, fallback_path, write_rows};

/// Result type for report generation
pub type ReportResult<T> = Result<T, ReportError>;

/// Error types for report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What a report run produced
#[derive(Debug, Clone)]
pub struct ReportSummary {
    /// File actually written (the fallback when the target was locked)
    pub path: PathBuf,
    pub rows: usize,
    pub missing_observed: usize,
}

/// Build the report for `store` and write it to `out`
pub fn generate(
    store: &CaseStore,
    artifacts: &ArtifactStore,
    out: &std::path::Path,
) -> ReportResult<ReportSummary> {
    let report = build_rows(&store.cases, artifacts)?;
    if report.missing_observed > 0 {
        info!(missing = report.missing_observed, "cases without observed output");
    }
    let path = write_rows(&report.rows, out)?;
    Ok(ReportSummary {
        path,
        rows: report.rows.len(),
        missing_observed: report.missing_observed,
    })
}
