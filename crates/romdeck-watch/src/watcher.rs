//! Library filesystem watcher
//!
//! Bridges `notify` events onto a bounded channel consumed by a single
//! task that classifies each path and feeds the rescan scheduler. Any
//! single bad event is logged and dropped; the loop keeps running.

use crate::{RescanScheduler, WatchError, classify};
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{EventKind, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Bound on buffered events between the notify callback and the consumer
const CHANNEL_CAPACITY: usize = 512;

/// Watches the library root and schedules rescans for observed changes.
///
/// Dropping the watcher stops event delivery and the consumer task.
pub struct LibraryWatcher {
    /// Keeps the OS watch registered; never read directly
    _watcher: notify::RecommendedWatcher,
    task: JoinHandle<()>,
}

impl LibraryWatcher {
    /// Start watching `watch_root` recursively
    pub fn start(
        watch_root: impl Into<PathBuf>,
        scheduler: Arc<RescanScheduler>,
    ) -> Result<Self, WatchError> {
        let watch_root = watch_root.into();
        let (tx, rx) = mpsc::channel::<notify::Event>(CHANNEL_CAPACITY);

        let mut watcher = notify::RecommendedWatcher::new(
            move |result: Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if tx.try_send(event).is_err() {
                        warn!("Watcher channel full, dropping filesystem event");
                    }
                }
                Err(e) => warn!("Filesystem watcher error: {e}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&watch_root, RecursiveMode::Recursive)?;

        info!("Watching {} for changes", watch_root.display());

        let task = tokio::spawn(run_event_loop(rx, watch_root, scheduler));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_event_loop(
    mut rx: mpsc::Receiver<notify::Event>,
    watch_root: PathBuf,
    scheduler: Arc<RescanScheduler>,
) {
    while let Some(event) = rx.recv().await {
        if !is_relevant(&event.kind) {
            continue;
        }

        let is_directory = event_is_directory(&event);
        for path in &event.paths {
            info!("Filesystem event: {:?} {}", event.kind, path.display());
            handle_path(&watch_root, &scheduler, path, is_directory);
        }
    }
}

fn handle_path(
    watch_root: &Path,
    scheduler: &RescanScheduler,
    path: &Path,
    is_directory: bool,
) {
    match classify(watch_root, path, is_directory) {
        Ok(Some(change)) => scheduler.handle_change(&change),
        Ok(None) => {}
        Err(e) => warn!("Ignoring unclassifiable path: {e}"),
    }
}

/// Creations, removals, and renames matter; pure data/metadata
/// modifications and access events do not
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

fn event_is_directory(event: &notify::Event) -> bool {
    match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => true,
        EventKind::Create(CreateKind::File) | EventKind::Remove(RemoveKind::File) => false,
        // Renames and untyped events: fall back to the filesystem
        _ => event.paths.iter().any(|path| path.is_dir()),
    }
}
