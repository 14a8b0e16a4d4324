//! JSON test case store.
//!
//! The document is a JSON array of [`TestCase`] objects. Loading is
//! all-or-nothing: a non-array document, an unreadable record, an empty id or
//! a duplicate id rejects the whole store before any case runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::{ScenarioCase, TestCase};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Reasons a store is unusable
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot read test cases at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write test cases to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("test cases at {path} are not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Testcases file must be an array: {0}")]
    NotArray(PathBuf),

    #[error("test case #{index} in {path} is malformed: {source}")]
    Record {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("test case #{0} has an empty id")]
    EmptyId(usize),

    #[error("duplicate test case id: {0}")]
    DuplicateId(String),
}

/// An ordered set of test cases backed by a JSON file
#[derive(Debug, Clone)]
pub struct CaseStore {
    pub path: PathBuf,
    pub cases: Vec<TestCase>,
}

impl CaseStore {
    /// Load and validate the store at `path`
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_json_str(path, &raw)
    }

    /// Parse and validate a store from JSON text
    pub fn from_json_str(path: impl Into<PathBuf>, raw: &str) -> StoreResult<Self> {
        let path = path.into();
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;

        let serde_json::Value::Array(items) = value else {
            return Err(StoreError::NotArray(path));
        };

        let mut cases = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let case: TestCase =
                serde_json::from_value(item).map_err(|source| StoreError::Record {
                    path: path.clone(),
                    index,
                    source,
                })?;
            cases.push(case);
        }

        let store = Self { path, cases };
        store.validate()?;
        debug!(path = %store.path.display(), cases = store.cases.len(), "loaded test cases");
        Ok(store)
    }

    /// Check id presence and uniqueness
    pub fn validate(&self) -> StoreResult<()> {
        let mut seen = HashSet::with_capacity(self.cases.len());
        for (index, case) in self.cases.iter().enumerate() {
            if case.id.trim().is_empty() {
                return Err(StoreError::EmptyId(index));
            }
            if !seen.insert(case.id.as_str()) {
                return Err(StoreError::DuplicateId(case.id.clone()));
            }
        }
        Ok(())
    }

    /// Tag every case with its scenario
    pub fn scenario_cases(&self, realtime_case: &str) -> Vec<ScenarioCase> {
        self.cases
            .iter()
            .cloned()
            .map(|case| ScenarioCase::new(case, realtime_case))
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Render the store as pretty JSON with a trailing newline
    pub fn to_json(&self) -> StoreResult<String> {
        let mut out = serde_json::to_string_pretty(&self.cases).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        out.push('\n');
        Ok(out)
    }

    /// Write the store back through a sibling temp file and a rename
    pub fn save(&self) -> StoreResult<()> {
        let json = self.to_json()?;
        let tmp = temp_sibling(&self.path);
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        fs::write(&tmp, json).map_err(write_err)?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "testcases.json".to_string());
    path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}
