//! Bulk id remap.
//!
//! Legacy upper-case ids are rewritten to the current scheme:
//!
//! | Old | New |
//! |-----|-----|
//! | `POS_FUN_dddd` | `Pos_Fun_dddd` |
//! | `NEG_FUN_dddd` | `Neg_Fun_dddd` |
//! | `UI_dddd` | `Pos_UI_dddd` |
//!
//! The store and the artifact files move together: collisions are rejected
//! before anything changes, a failed rename undoes the renames already done,
//! and a failed store write undoes every rename.

use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{MaintenanceError, MaintenanceResult};
use crate::artifacts::ArtifactStore;
use crate::cases::CaseStore;

static LEGACY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(POS_FUN|NEG_FUN|UI)_(\d{4})$").expect("legacy id pattern is valid")
});

/// What a remap pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapSummary {
    /// `(old, new)` pairs applied, in store order
    pub mapping: Vec<(String, String)>,
    pub renamed_observed: usize,
    pub renamed_debug: usize,
}

/// New id for a legacy id, `None` when the id is not in a legacy form
pub fn remapped_id(id: &str) -> Option<String> {
    let captures = LEGACY_ID.captures(id)?;
    let number = &captures[2];
    if number == "0000" {
        return None;
    }
    let prefix = match &captures[1] {
        "POS_FUN" => "Pos_Fun",
        "NEG_FUN" => "Neg_Fun",
        _ => "Pos_UI",
    };
    Some(format!("{}_{}", prefix, number))
}

/// A file move that has been carried out
struct Moved {
    from: PathBuf,
    to: PathBuf,
    observed: bool,
}

/// Remap legacy ids in `store` and rename their artifacts
pub fn remap_ids(store: &mut CaseStore, artifacts: &ArtifactStore) -> MaintenanceResult<RemapSummary> {
    let mapping: Vec<(String, String)> = store
        .cases
        .iter()
        .filter_map(|case| remapped_id(&case.id).map(|new| (case.id.clone(), new)))
        .collect();

    if mapping.is_empty() {
        info!("no legacy ids to remap");
        return Ok(RemapSummary::default());
    }

    check_collisions(store, artifacts, &mapping)?;

    let moved = rename_artifacts(artifacts, &mapping)?;

    let mut updated = store.clone();
    for case in &mut updated.cases {
        if let Some((_, new)) = mapping.iter().find(|(old, _)| *old == case.id) {
            case.id = new.clone();
        }
    }
    if let Err(err) = updated.save() {
        warn!(error = %err, "store write failed, restoring artifact names");
        undo(&moved);
        return Err(err.into());
    }
    *store = updated;

    let summary = RemapSummary {
        renamed_observed: moved.iter().filter(|m| m.observed).count(),
        renamed_debug: moved.iter().filter(|m| !m.observed).count(),
        mapping,
    };
    info!(
        ids = summary.mapping.len(),
        observed = summary.renamed_observed,
        debug = summary.renamed_debug,
        "remapped ids"
    );
    Ok(summary)
}

fn check_collisions(
    store: &CaseStore,
    artifacts: &ArtifactStore,
    mapping: &[(String, String)],
) -> MaintenanceResult<()> {
    for (old, new) in mapping {
        let collision = |reason: String| MaintenanceError::Collision {
            from: old.clone(),
            to: new.clone(),
            reason,
        };
        if store.contains(new) {
            return Err(collision(format!("id {} already exists", new)));
        }
        for target in artifacts.paths(new) {
            if target.exists() {
                return Err(collision(format!("{} already exists", target.display())));
            }
        }
    }
    Ok(())
}

fn rename_artifacts(artifacts: &ArtifactStore, mapping: &[(String, String)]) -> MaintenanceResult<Vec<Moved>> {
    let mut moved = Vec::new();
    for (old, new) in mapping {
        let pairs = [
            (artifacts.observed_path(old), artifacts.observed_path(new), true),
            (artifacts.debug_path(old), artifacts.debug_path(new), false),
        ];
        for (from, to, observed) in pairs {
            if !from.exists() {
                continue;
            }
            if let Err(source) = fs::rename(&from, &to) {
                undo(&moved);
                return Err(MaintenanceError::Rename { from, to, source });
            }
            moved.push(Moved { from, to, observed });
        }
    }
    Ok(moved)
}

fn undo(moved: &[Moved]) {
    for m in moved.iter().rev() {
        if let Err(err) = fs::rename(&m.to, &m.from) {
            warn!(from = %m.to.display(), to = %m.from.display(), error = %err, "could not restore file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::TestCase;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, ids: &[&str]) -> (CaseStore, ArtifactStore) {
        let store = CaseStore {
            path: dir.path().join("testcases.json"),
            cases: ids
                .iter()
                .map(|id| TestCase::new(*id, "positive", "mama", "මම"))
                .collect(),
        };
        store.save().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug"));
        (store, artifacts)
    }

    #[test]
    fn test_remapped_id() {
        assert_eq!(remapped_id("POS_FUN_0001").as_deref(), Some("Pos_Fun_0001"));
        assert_eq!(remapped_id("NEG_FUN_0042").as_deref(), Some("Neg_Fun_0042"));
        assert_eq!(remapped_id("UI_0001").as_deref(), Some("Pos_UI_0001"));
        assert_eq!(remapped_id("Pos_Fun_0001"), None);
        assert_eq!(remapped_id("POS_FUN_1"), None);
        assert_eq!(remapped_id("POS_FUN_0000"), None);
        assert_eq!(remapped_id("XPOS_FUN_0001"), None);
    }

    #[test]
    fn test_remap_moves_store_and_files_together() {
        let dir = TempDir::new().unwrap();
        let (mut store, artifacts) = fixture(&dir, &["POS_FUN_0001", "Neg_Fun_0001"]);
        artifacts.write_observed("POS_FUN_0001", "මම").unwrap();
        artifacts.write_debug("POS_FUN_0001", "<html/>").unwrap();

        let summary = remap_ids(&mut store, &artifacts).unwrap();

        assert_eq!(summary.mapping, vec![("POS_FUN_0001".to_string(), "Pos_Fun_0001".to_string())]);
        assert_eq!((summary.renamed_observed, summary.renamed_debug), (1, 1));
        assert!(!artifacts.observed_path("POS_FUN_0001").exists());
        assert_eq!(artifacts.read_observed("Pos_Fun_0001").unwrap().as_deref(), Some("මම"));
        assert!(artifacts.debug_path("Pos_Fun_0001").exists());

        let raw = fs::read_to_string(&store.path).unwrap();
        assert!(!raw.contains("POS_FUN_0001"));
        assert!(raw.contains("Pos_Fun_0001"));
        assert_eq!(store.cases[0].id, "Pos_Fun_0001");
    }

    #[test]
    fn test_collision_with_existing_id_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut store, artifacts) = fixture(&dir, &["POS_FUN_0001", "Pos_Fun_0001"]);
        artifacts.write_observed("POS_FUN_0001", "old").unwrap();
        let before = fs::read_to_string(&store.path).unwrap();

        let err = remap_ids(&mut store, &artifacts).unwrap_err();

        assert!(matches!(err, MaintenanceError::Collision { .. }));
        assert!(artifacts.observed_path("POS_FUN_0001").exists());
        assert_eq!(fs::read_to_string(&store.path).unwrap(), before);
    }

    #[test]
    fn test_collision_with_existing_file_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut store, artifacts) = fixture(&dir, &["UI_0001"]);
        artifacts.write_observed("UI_0001", "a").unwrap();
        artifacts.write_observed("Pos_UI_0001", "b").unwrap();

        let err = remap_ids(&mut store, &artifacts).unwrap_err();

        assert!(err.to_string().contains("Pos_UI_0001.txt"));
        assert_eq!(artifacts.read_observed("UI_0001").unwrap().as_deref(), Some("a"));
        assert_eq!(store.cases[0].id, "UI_0001");
    }

    #[test]
    fn test_failed_store_write_restores_files() {
        let dir = TempDir::new().unwrap();
        let (mut store, artifacts) = fixture(&dir, &["NEG_FUN_0003"]);
        artifacts.write_observed("NEG_FUN_0003", "x").unwrap();
        store.path = dir.path().join("missing").join("testcases.json");

        let err = remap_ids(&mut store, &artifacts).unwrap_err();

        assert!(matches!(err, MaintenanceError::Store(_)));
        assert!(artifacts.observed_path("NEG_FUN_0003").exists());
        assert!(!artifacts.observed_path("Neg_Fun_0003").exists());
        assert_eq!(store.cases[0].id, "NEG_FUN_0003");
    }
}
