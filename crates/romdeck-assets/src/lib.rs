//! User asset lifecycle management for Romdeck
//!
//! Uploads, updates, deletions, and keep-list purges of per-user save and
//! save-state files, keeping database rows, files on disk, and the
//! per-user last-played timestamp consistent.

mod filesystem;
mod synchronizer;

pub use filesystem::{AssetFilesystem, LibraryAssetFs};
pub use synchronizer::{AssetSynchronizer, UploadFile, UploadResult};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Rom with ID {0} not found")]
    RomNotFound(i64),

    #[error("Asset with ID {0} not found")]
    NotFound(i64),

    #[error("Not authorized to modify asset {0}")]
    Forbidden(i64),

    #[error("No asset ids were provided")]
    BadRequest,

    #[error("Asset rows deleted but files missing from filesystem: {}", .0.join(", "))]
    FileSystemInconsistency(Vec<String>),

    #[error("Store error: {0}")]
    Store(#[from] romdeck_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
