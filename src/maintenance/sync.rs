use tracing::info;

use super::{MaintenanceError, MaintenanceResult};
use crate::artifacts::ArtifactStore;
use crate::cases::CaseStore;

/// Counts from a sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub updated: usize,
    pub missing: usize,
}

/// Set each case's `actual` to its trimmed observed output and save the store.
///
/// Cases without an observed file keep whatever `actual` they had.
pub fn sync_observed(store: &mut CaseStore, artifacts: &ArtifactStore) -> MaintenanceResult<SyncSummary> {
    if !artifacts.observed_dir.is_dir() {
        return Err(MaintenanceError::ObservedDirMissing(artifacts.observed_dir.clone()));
    }

    let mut summary = SyncSummary::default();
    for case in &mut store.cases {
        let observed = artifacts
            .read_observed(&case.id)
            .map_err(|source| MaintenanceError::Read {
                path: artifacts.observed_path(&case.id),
                source,
            })?;
        match observed {
            Some(text) => {
                case.actual = Some(text.trim().to_string());
                summary.updated += 1;
            }
            None => summary.missing += 1,
        }
    }

    store.save()?;
    info!(
        path = %store.path.display(),
        updated = summary.updated,
        missing = summary.missing,
        "applied observed outputs"
    );
    Ok(summary)
}
