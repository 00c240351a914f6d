//! Romdeck watcher daemon
//!
//! Watches the library tree for changes, schedules debounced rescans, and
//! runs the periodic background rescan of unidentified entries.

use anyhow::{Context, Result};
use romdeck_config::RomdeckConfig;
use romdeck_scan::{JobQueue, LibraryScanner, ScanExecutor, ScheduledRescanTask};
use romdeck_store::Database;
use romdeck_watch::{LibraryWatcher, PlatformLookup, RescanScheduler};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let config = RomdeckConfig::load_default().context("Failed to load configuration")?;
    info!("Romdeck watcher starting...");

    if let Some(parent) = config.library.database_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = Arc::new(
        Database::open(&config.library.database_path).context("Failed to open database")?,
    );

    let scanner = Arc::new(LibraryScanner::new(
        Arc::clone(&db),
        &config.library.base_path,
    ));
    let queue = Arc::new(JobQueue::new(
        Arc::clone(&scanner) as Arc<dyn ScanExecutor>
    ));

    let scheduler = Arc::new(RescanScheduler::new(
        Arc::clone(&queue),
        Arc::clone(&db) as Arc<dyn PlatformLookup>,
        config.rescan.clone(),
    ));

    let _watcher = LibraryWatcher::start(&config.library.base_path, scheduler)
        .context("Failed to start library watcher")?;

    let rescan_task = ScheduledRescanTask::new(
        Arc::clone(&scanner) as Arc<dyn ScanExecutor>,
        config.rescan.scheduled,
        config.rescan.scheduled_interval(),
    );
    rescan_task.schedule();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    rescan_task.unschedule();

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
