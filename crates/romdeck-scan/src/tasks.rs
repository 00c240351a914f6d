//! Periodic background rescan task

use crate::{ScanError, ScanExecutor, ScanType};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Recurring whole-library scan of unidentified entries
///
/// When the configuration flag is off, a tick unschedules the task
/// instead of scanning.
pub struct ScheduledRescanTask {
    executor: Arc<dyn ScanExecutor>,
    enabled: bool,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledRescanTask {
    pub fn new(executor: Arc<dyn ScanExecutor>, enabled: bool, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            executor,
            enabled,
            interval,
            handle: Mutex::new(None),
        })
    }

    /// Start the recurring schedule
    pub fn schedule(self: &Arc<Self>) {
        let task = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(task.interval).await;
                if let Err(e) = task.run().await {
                    error!("Scheduled library scan failed: {e}");
                }
            }
        });

        *self.handle.lock() = Some(handle);
    }

    /// One tick: scan unidentified entries across the library, or
    /// unschedule when disabled
    pub async fn run(&self) -> Result<(), ScanError> {
        if !self.enabled {
            info!("Scheduled library scan not enabled, unscheduling");
            self.unschedule();
            return Ok(());
        }

        info!("Scheduled library scan started");
        self.executor
            .scan_platforms(&[], ScanType::Unidentified)
            .await?;
        info!("Scheduled library scan done");
        Ok(())
    }

    /// Stop the recurring schedule
    pub fn unschedule(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Whether the recurring schedule is currently active
    pub fn is_scheduled(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl Drop for ScheduledRescanTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RecordingExecutor {
        calls: Mutex<Vec<(Vec<i64>, ScanType)>>,
    }

    impl RecordingExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ScanExecutor for RecordingExecutor {
        async fn scan_platforms(
            &self,
            platform_ids: &[i64],
            scan_type: ScanType,
        ) -> Result<(), ScanError> {
            self.calls.lock().push((platform_ids.to_vec(), scan_type));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_enabled_scans_unidentified_library_wide() {
        let executor = RecordingExecutor::new();
        let task = ScheduledRescanTask::new(executor.clone(), true, Duration::from_secs(3600));

        task.run().await.unwrap();

        let calls = executor.calls.lock().clone();
        assert_eq!(calls, vec![(vec![], ScanType::Unidentified)]);
    }

    #[tokio::test]
    async fn test_run_disabled_unschedules_without_scanning() {
        let executor = RecordingExecutor::new();
        let task = ScheduledRescanTask::new(executor.clone(), false, Duration::from_secs(3600));
        task.schedule();
        assert!(task.is_scheduled());

        task.run().await.unwrap();

        assert!(!task.is_scheduled());
        assert!(executor.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_schedule_fires() {
        let executor = RecordingExecutor::new();
        let task = ScheduledRescanTask::new(executor.clone(), true, Duration::from_millis(20));
        task.schedule();

        tokio::time::sleep(Duration::from_millis(90)).await;
        task.unschedule();

        assert!(!executor.calls.lock().is_empty());
    }
}
