use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::coordinator::SyncCoordinator;
use crate::error::SyncResult;
use crate::types::PassReport;

/// Default time between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Totals across the lifetime of a [`SyncDriver::run`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub passes: usize,
    pub failed_passes: usize,
}

/// Schedules sync passes: one immediately, then one per interval, until the
/// cancel token fires.
///
/// Each scheduled round runs every registered coordinator in order. A failing
/// pass is logged and the next round starts fresh.
pub struct SyncDriver {
    coordinators: Vec<SyncCoordinator>,
    interval: Duration,
}

impl SyncDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            coordinators: Vec::new(),
            interval,
        }
    }

    pub fn with_coordinator(mut self, coordinator: SyncCoordinator) -> Self {
        self.coordinators.push(coordinator);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn coordinators(&self) -> &[SyncCoordinator] {
        &self.coordinators
    }

    /// Run every coordinator once, in order.
    pub async fn run_once(&self, cancel: &CancelToken) -> Vec<SyncResult<PassReport>> {
        let mut results = Vec::with_capacity(self.coordinators.len());
        for coordinator in &self.coordinators {
            if cancel.is_cancelled() {
                break;
            }
            results.push(coordinator.run(cancel).await);
        }
        results
    }

    /// Run rounds until `cancel` fires.
    pub async fn run(&self, cancel: CancelToken) -> DriverStats {
        let mut stats = DriverStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "sync driver started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            for result in self.run_once(&cancel).await {
                stats.passes += 1;
                if let Err(err) = result {
                    stats.failed_passes += 1;
                    warn!(error = %err, "sync pass failed; retrying next round");
                }
            }
        }

        info!(passes = stats.passes, failed = stats.failed_passes, "sync driver stopped");
        stats
    }
}
