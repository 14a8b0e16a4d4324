//! Per-case artifact files.
//!
//! Each case owns two files keyed by its sanitized id:
//! - `observed/<id>.txt`: the last observed output, trimmed
//! - `debug/<id>.html`: the page markup at the end of the case
//!
//! Files are overwritten on every run; no history is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::PathSettings;

/// Extension of observed-output files
pub const OBSERVED_EXT: &str = "txt";

/// Extension of debug snapshot files
pub const DEBUG_EXT: &str = "html";

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// The observed and debug directories
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    pub observed_dir: PathBuf,
    pub debug_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(observed_dir: impl Into<PathBuf>, debug_dir: impl Into<PathBuf>) -> Self {
        Self {
            observed_dir: observed_dir.into(),
            debug_dir: debug_dir.into(),
        }
    }

    pub fn from_settings(paths: &PathSettings) -> Self {
        Self::new(&paths.observed_dir, &paths.debug_dir)
    }

    pub fn observed_path(&self, id: &str) -> PathBuf {
        artifact_path(&self.observed_dir, id, OBSERVED_EXT)
    }

    pub fn debug_path(&self, id: &str) -> PathBuf {
        artifact_path(&self.debug_dir, id, DEBUG_EXT)
    }

    /// Both artifact paths of a case, observed first
    pub fn paths(&self, id: &str) -> [PathBuf; 2] {
        [self.observed_path(id), self.debug_path(id)]
    }

    /// Write the trimmed observed text, creating the directory if needed
    pub fn write_observed(&self, id: &str, text: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.observed_dir)?;
        let path = self.observed_path(id);
        fs::write(&path, text.trim())?;
        Ok(path)
    }

    /// Observed text of a case, `None` when it was never observed
    pub fn read_observed(&self, id: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.observed_path(id)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn write_debug(&self, id: &str, markup: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.debug_dir)?;
        let path = self.debug_path(id);
        fs::write(&path, markup)?;
        Ok(path)
    }
}

fn artifact_path(dir: &Path, id: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_id(id), ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("Pos_Fun_0001"), "Pos_Fun_0001");
        assert_eq!(sanitize_id("a b/c.d"), "a_b_c_d");
        assert_eq!(sanitize_id("ui-01"), "ui-01");
        assert_eq!(sanitize_id("මම"), "__");
    }

    #[test]
    fn test_observed_round_trip_trims() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug"));

        assert_eq!(store.read_observed("Pos_Fun_0001").unwrap(), None);
        let path = store.write_observed("Pos_Fun_0001", "  මම ගෙදර යනවා \n").unwrap();
        assert_eq!(path, dir.path().join("observed").join("Pos_Fun_0001.txt"));
        assert_eq!(
            store.read_observed("Pos_Fun_0001").unwrap().as_deref(),
            Some("මම ගෙදර යනවා")
        );
    }

    #[test]
    fn test_debug_snapshot_uses_sanitized_name() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug"));

        let path = store.write_debug("case 7", "<html></html>").unwrap();
        assert_eq!(path, dir.path().join("debug").join("case_7.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
