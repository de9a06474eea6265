//! Watch cycle scheduler
//!
//! A two-state machine (Idle / Scheduled) owned by the process supervisor.
//! While enabled, it arms a one-shot timer with an interval picked uniformly
//! at random from the configured candidates, runs a cycle when it fires, and
//! re-arms - an unending loop until `stop()` cancels the pending timer. The
//! timer handle and the enabled flag live here as fields, never as ambient
//! globals.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::watcher::CycleRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
}

pub struct WatchScheduler {
    runner: Arc<dyn CycleRunner>,
    enabled: bool,
    intervals: Vec<Duration>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl WatchScheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, enabled: bool, intervals: Vec<Duration>) -> Self {
        Self {
            runner,
            enabled,
            intervals,
            cancel: None,
            handle: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.handle.is_some() {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Idle
        }
    }

    /// Idle -> Scheduled. A no-op when the toggle is disabled, when no
    /// candidate intervals are configured, or when already scheduled.
    pub fn start(&mut self) -> SchedulerState {
        if self.handle.is_some() {
            return SchedulerState::Scheduled;
        }
        if !self.enabled {
            tracing::info!("Watcher disabled; scheduler stays idle");
            return SchedulerState::Idle;
        }
        if self.intervals.is_empty() {
            tracing::warn!("No watch intervals configured; scheduler stays idle");
            return SchedulerState::Idle;
        }

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let runner = Arc::clone(&self.runner);
        let intervals = self.intervals.clone();

        let handle = tokio::spawn(async move {
            loop {
                let interval = intervals[fastrand::usize(..intervals.len())];
                tracing::info!("Next watch cycle in {}s", interval.as_secs());
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = sleep(interval) => {
                        match runner.run_cycle().await {
                            Ok(report) => tracing::info!("{}", report.message()),
                            Err(error) => tracing::error!("Watch cycle failed: {error:#}"),
                        }
                    }
                }
            }
            tracing::info!("Scheduler loop stopped");
        });

        self.cancel = Some(cancel);
        self.handle = Some(handle);
        SchedulerState::Scheduled
    }

    /// Scheduled -> Idle. Cancels the pending timer; an in-flight cycle is
    /// allowed to finish before the loop exits.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.take() {
            if let Err(error) = handle.await {
                tracing::error!("Scheduler loop join failed: {error}");
            }
        }
    }
}
