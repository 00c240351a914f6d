//! Delayed scan job queue
//!
//! Jobs are keyed, typed descriptors rather than opaque callables, so
//! callers can inspect the pending set to suppress duplicate work. A job
//! leaves the pending set before its executor runs; `pending()` is a
//! point-in-time snapshot and a snapshot/schedule race may produce at most
//! one redundant job, never a missing one.

use crate::{ScanExecutor, ScanType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

/// A scheduled-but-not-yet-fired scan job
#[derive(Debug, Clone)]
pub struct ScanJob {
    /// Target platforms; empty means the whole library
    pub platform_ids: Vec<i64>,
    pub scan_type: ScanType,
    pub scheduled_at: Instant,
}

impl ScanJob {
    /// Whether this job covers the whole library
    pub fn is_full_library(&self) -> bool {
        self.platform_ids.is_empty()
    }

    /// Whether this job already covers the given platform
    pub fn covers(&self, platform_id: i64) -> bool {
        self.platform_ids.contains(&platform_id)
    }
}

/// Handle to a scheduled job, usable to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle(u64);

struct PendingJob {
    job: ScanJob,
    /// Attached right after spawn; `None` only in the window between
    /// registering the job and attaching its timer task
    task: Option<JoinHandle<()>>,
}

/// Delayed scan scheduler with pending-job introspection
pub struct JobQueue {
    executor: Arc<dyn ScanExecutor>,
    pending: Arc<Mutex<HashMap<u64, PendingJob>>>,
    next_id: AtomicU64,
}

impl JobQueue {
    pub fn new(executor: Arc<dyn ScanExecutor>) -> Self {
        Self {
            executor,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedule a scan to run after `delay`
    pub fn schedule(
        &self,
        platform_ids: Vec<i64>,
        scan_type: ScanType,
        delay: Duration,
    ) -> JobHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = ScanJob {
            platform_ids,
            scan_type,
            scheduled_at: Instant::now() + delay,
        };

        // Register before spawning so the job is visible to dedup checks
        // and cannot fire before it exists in the pending set
        self.pending
            .lock()
            .insert(id, PendingJob { job, task: None });

        let pending = Arc::clone(&self.pending);
        let executor = Arc::clone(&self.executor);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Leave the pending set before running, so events arriving
            // during the scan are free to schedule follow-up work. A job
            // cancelled in the same instant finds its entry gone and stops.
            let fired = match pending.lock().remove(&id) {
                Some(entry) => entry.job,
                None => return,
            };

            debug!(
                "Running {} scan for {:?}",
                fired.scan_type.as_str(),
                fired.platform_ids
            );
            if let Err(e) = executor
                .scan_platforms(&fired.platform_ids, fired.scan_type)
                .await
            {
                error!("Scan job failed: {e}");
            }
        });

        match self.pending.lock().get_mut(&id) {
            Some(entry) => entry.task = Some(task),
            // Cancelled before the timer task was attached
            None => task.abort(),
        }
        JobHandle(id)
    }

    /// Point-in-time snapshot of scheduled-but-not-yet-fired jobs
    pub fn pending(&self) -> Vec<ScanJob> {
        self.pending
            .lock()
            .values()
            .map(|entry| entry.job.clone())
            .collect()
    }

    /// Cancel a scheduled job; returns false if it already fired
    pub fn cancel(&self, handle: JobHandle) -> bool {
        match self.pending.lock().remove(&handle.0) {
            Some(entry) => {
                if let Some(task) = entry.task {
                    task.abort();
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanError;
    use async_trait::async_trait;

    /// Executor that records every invocation
    struct RecordingExecutor {
        calls: Mutex<Vec<(Vec<i64>, ScanType)>>,
    }

    impl RecordingExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Vec<i64>, ScanType)> {
            self.calls.lock().clone()
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
    async fn test_job_fires_after_delay() {
        let executor = RecordingExecutor::new();
        let queue = JobQueue::new(executor.clone());

        queue.schedule(vec![1], ScanType::Quick, Duration::from_millis(20));
        assert_eq!(queue.pending().len(), 1);
        assert!(executor.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(executor.calls(), vec![(vec![1], ScanType::Quick)]);
        assert!(queue.pending().is_empty());
    }

    #[tokio::test]
    async fn test_fired_job_leaves_pending_before_running() {
        let executor = RecordingExecutor::new();
        let queue = JobQueue::new(executor.clone());

        queue.schedule(vec![], ScanType::Full, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(queue.pending().is_empty());

        // A later event can schedule anew
        queue.schedule(vec![], ScanType::Full, Duration::from_millis(10));
        assert_eq!(queue.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_firing() {
        let executor = RecordingExecutor::new();
        let queue = JobQueue::new(executor.clone());

        let handle = queue.schedule(vec![2], ScanType::Quick, Duration::from_millis(30));
        assert!(queue.cancel(handle));
        assert!(queue.pending().is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(executor.calls().is_empty());

        // Cancelling again reports the job as gone
        assert!(!queue.cancel(handle));
    }

    #[tokio::test]
    async fn test_pending_snapshot_describes_jobs() {
        let executor = RecordingExecutor::new();
        let queue = JobQueue::new(executor);

        queue.schedule(vec![], ScanType::Full, Duration::from_secs(60));
        queue.schedule(vec![5], ScanType::Quick, Duration::from_secs(60));

        let pending = queue.pending();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().any(|job| job.is_full_library()));
        assert!(pending.iter().any(|job| job.covers(5)));
        assert!(!pending.iter().any(|job| job.covers(6)));
    }
}
