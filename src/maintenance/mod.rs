//! Store post-processing utilities.
//!
//! - [`sync`]: copy observed outputs into each case's `actual` field
//! - [`verify`]: recount verdicts per scenario group from observed outputs
//! - [`remap`]: rename legacy ids in the store and their artifact files together

use std::path::PathBuf;

use thiserror::Error;

use crate::cases::StoreError;

pub mod remap;
pub mod sync;
pub mod verify;

pub use remap::{RemapSummary, remap_ids, remapped_id};
pub use sync::{SyncSummary, sync_observed};
pub use verify::{GroupCounts, VerifySummary, verify_counts};

/// Result type for maintenance operations
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Error types for maintenance operations
#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("observed directory not found: {0}")]
    ObservedDirMissing(PathBuf),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot rename {from} to {to}: {reason}")]
    Collision {
        from: String,
        to: String,
        reason: String,
    },

    #[error("rename {from} -> {to} failed: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
