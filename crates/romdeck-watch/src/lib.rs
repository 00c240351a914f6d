//! Filesystem change handling for Romdeck
//!
//! Turns raw notifications under the library root into classified changes
//! and converts those into a minimal set of delayed rescan jobs.

mod classifier;
mod scheduler;
mod watcher;

pub use classifier::{ChangeDepth, ClassificationError, ClassifiedChange, classify};
pub use scheduler::{PlatformLookup, RescanScheduler};
pub use watcher::LibraryWatcher;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
