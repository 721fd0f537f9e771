//! Run handles
//!
//! A [`RunHandle`] is returned as soon as a crawl has been scheduled. It
//! exposes a consistent snapshot of the run's status and counts, lets the
//! caller wait for a terminal status with a bound, and cancels the run.

use crate::state::{RunCounts, RunStatus};
use crate::FusionError;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Snapshot of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: i64,
    pub status: RunStatus,
    pub counts: RunCounts,
    pub keyword: Option<String>,
    pub source_id: Option<i64>,
    /// Reason for a `Failed` run
    pub failure: Option<String>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} {}: discovered {}, stored {}, duplicates {}, errors {}, dropped {}",
            self.run_id,
            self.status,
            self.counts.discovered,
            self.counts.stored,
            self.counts.duplicates,
            self.counts.errors,
            self.counts.dropped
        )?;
        if let Some(reason) = &self.failure {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

/// Mutable run state shared between the driver and handles
#[derive(Debug)]
pub(crate) struct RunState {
    inner: Mutex<RunReport>,
    status_tx: watch::Sender<RunStatus>,
}

impl RunState {
    pub(crate) fn new(run_id: i64, keyword: Option<String>, source_id: Option<i64>) -> Self {
        let (status_tx, _) = watch::channel(RunStatus::Pending);
        Self {
            inner: Mutex::new(RunReport {
                run_id,
                status: RunStatus::Pending,
                counts: RunCounts::default(),
                keyword,
                source_id,
                failure: None,
            }),
            status_tx,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunReport> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn snapshot(&self) -> RunReport {
        self.lock().clone()
    }

    /// Moves the run to `next`, rejecting transitions the lifecycle forbids
    pub(crate) fn transition(&self, next: RunStatus) -> Result<(), FusionError> {
        let mut report = self.lock();
        if !report.status.can_transition_to(next) {
            return Err(FusionError::InvalidTransition {
                from: report.status,
                to: next,
            });
        }
        report.status = next;
        self.status_tx.send_replace(next);
        Ok(())
    }

    /// Applies `update` to the counts under the state lock
    pub(crate) fn update_counts(&self, update: impl FnOnce(&mut RunCounts)) {
        let mut report = self.lock();
        // Counts are frozen once the run is terminal
        if !report.status.is_terminal() {
            update(&mut report.counts);
        }
    }

    /// Moves the run to a terminal status, recording a failure reason
    ///
    /// Counts freeze immediately. `record` runs before waiters are woken, so
    /// anything it persists is visible once `RunHandle::wait` returns.
    pub(crate) fn finish(
        &self,
        status: RunStatus,
        failure: Option<String>,
        record: impl FnOnce(&RunReport),
    ) -> Result<RunReport, FusionError> {
        let report = {
            let mut report = self.lock();
            if !report.status.can_transition_to(status) {
                return Err(FusionError::InvalidTransition {
                    from: report.status,
                    to: status,
                });
            }
            report.status = status;
            report.failure = failure;
            report.clone()
        };

        record(&report);
        self.status_tx.send_replace(status);
        Ok(report)
    }

    fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status_tx.subscribe()
    }
}

/// Caller-side handle to a scheduled run
#[derive(Debug, Clone)]
pub struct RunHandle {
    state: Arc<RunState>,
    cancel: CancellationToken,
}

impl RunHandle {
    pub(crate) fn new(state: Arc<RunState>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    pub fn id(&self) -> i64 {
        self.state.snapshot().run_id
    }

    /// Current status and counts, read atomically
    pub fn status(&self) -> RunReport {
        self.state.snapshot()
    }

    /// Asks the run to stop; it ends as `TimedOut`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until the run reaches a terminal status or `limit` elapses
    ///
    /// Returns the latest snapshot either way; check `status.is_terminal()`
    /// to tell the two apart.
    pub async fn wait(&self, limit: Option<Duration>) -> RunReport {
        let mut rx = self.state.subscribe();
        let finished = async move {
            // The sender lives in the shared state, so it outlives this wait
            let _ = rx.wait_for(|status| status.is_terminal()).await;
        };

        match limit {
            Some(limit) => {
                let _ = tokio::time::timeout(limit, finished).await;
            }
            None => finished.await,
        }

        self.state.snapshot()
    }
}

/// Returns a consistent snapshot of the run behind `handle`
pub fn get_run_status(handle: &RunHandle) -> RunReport {
    handle.status()
}
