//! Scan execution and scan job scheduling for Romdeck
//!
//! Provides the library scanner that reconciles platform directories with
//! the store, a delayed job queue with pending-job introspection, and the
//! periodic background rescan task.

mod executor;
mod queue;
mod tasks;

pub use executor::{LibraryScanner, ScanExecutor, ScanSummary};
pub use queue::{JobHandle, JobQueue, ScanJob};
pub use tasks::ScheduledRescanTask;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Library root not found: {0}")]
    LibraryRootNotFound(PathBuf),

    #[error("Store error: {0}")]
    Store(#[from] romdeck_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scope of a library scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Reconcile every ROM under the targeted platforms
    Full,
    /// Skip platforms whose on-disk entry count already matches the store
    Quick,
    /// Only revisit ROMs that have not been identified yet
    Unidentified,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Full => "full",
            ScanType::Quick => "quick",
            ScanType::Unidentified => "unidentified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_type_names() {
        assert_eq!(ScanType::Full.as_str(), "full");
        assert_eq!(ScanType::Quick.as_str(), "quick");
        assert_eq!(ScanType::Unidentified.as_str(), "unidentified");
    }
}
