//! Rescan scheduling policy
//!
//! Converts classified change events into delayed scan jobs, suppressing
//! events that pending jobs already cover. The delay coalesces event
//! bursts; the pending-set check keeps a burst from producing duplicate
//! jobs.

use crate::classifier::{ChangeDepth, ClassifiedChange};
use romdeck_config::RescanConfig;
use romdeck_scan::{JobQueue, ScanType};
use romdeck_store::{Database, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

/// Platform resolution seam for the scheduling policy
pub trait PlatformLookup: Send + Sync {
    /// Resolve a filesystem slug to a platform id
    fn platform_id_by_fs_slug(&self, fs_slug: &str) -> Result<Option<i64>, StoreError>;
}

impl PlatformLookup for Database {
    fn platform_id_by_fs_slug(&self, fs_slug: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.platform_by_fs_slug(fs_slug)?.map(|platform| platform.id))
    }
}

/// Debounce/dedup policy engine for change-triggered rescans
pub struct RescanScheduler {
    queue: Arc<JobQueue>,
    platforms: Arc<dyn PlatformLookup>,
    config: RescanConfig,
}

impl RescanScheduler {
    pub fn new(
        queue: Arc<JobQueue>,
        platforms: Arc<dyn PlatformLookup>,
        config: RescanConfig,
    ) -> Self {
        Self {
            queue,
            platforms,
            config,
        }
    }

    /// Decide whether a classified change warrants a new delayed scan job
    pub fn handle_change(&self, change: &ClassifiedChange) {
        if !self.config.on_filesystem_change {
            return;
        }

        let platform_id = match self.platforms.platform_id_by_fs_slug(&change.platform_slug) {
            Ok(platform_id) => platform_id,
            Err(e) => {
                warn!("Platform lookup failed for {}: {e}", change.platform_slug);
                return;
            }
        };

        // Skip if a pending scan already covers this change
        for job in self.queue.pending() {
            if job.is_full_library() {
                info!("Full rescan already scheduled");
                return;
            }
            if let Some(id) = platform_id
                && job.covers(id)
            {
                info!("Scan already scheduled for {}", change.platform_slug);
                return;
            }
        }

        let delay = self.config.delay();
        let minutes = self.config.delay_minutes;

        // Any change to a platform directory itself invalidates the
        // per-platform shortcut (its identity may have changed), so the
        // whole library is rescanned.
        if change.depth == ChangeDepth::PlatformRoot && change.is_directory {
            info!("Platform directory changed, rescanning in {minutes} minutes");
            self.queue.schedule(Vec::new(), ScanType::Quick, delay);
        } else if let Some(id) = platform_id {
            info!(
                "Change detected in {} folder, rescanning in {minutes} minutes",
                change.platform_slug
            );
            self.queue.schedule(vec![id], ScanType::Quick, delay);
        } else {
            info!(
                "Change under unrecognized directory {}, nothing to scan",
                change.platform_slug
            );
        }
    }
}
