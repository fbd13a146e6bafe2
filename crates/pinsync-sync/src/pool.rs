use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::cancel::CancelToken;
use crate::error::TransferError;
use crate::queue::JobReceiver;
use crate::transfer::Transfer;
use crate::types::TransferOutcome;

/// Default number of concurrent transfer workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Fixed-size set of tokio tasks pulling jobs from a shared [`JobReceiver`].
///
/// Each worker runs at most one transfer at a time, so the pool size bounds
/// the number of transfers in flight. Workers stop when the queue closes or
/// the cancel token fires, and hand back the outcomes they recorded.
pub struct WorkerPool {
    handles: Vec<JoinHandle<Vec<TransferOutcome>>>,
}

impl WorkerPool {
    pub fn spawn(
        size: usize,
        transfer: Arc<Transfer>,
        jobs: JobReceiver,
        cancel: CancelToken,
    ) -> Self {
        let handles = (0..size.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&transfer),
                    jobs.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit and gather their outcomes.
    pub async fn join(self) -> Vec<TransferOutcome> {
        let mut outcomes = Vec::new();
        for (worker, handle) in self.handles.into_iter().enumerate() {
            match handle.await {
                Ok(recorded) => outcomes.extend(recorded),
                Err(err) => error!(worker, error = %err, "worker task failed"),
            }
        }
        outcomes
    }
}

async fn worker_loop(
    worker: usize,
    transfer: Arc<Transfer>,
    jobs: JobReceiver,
    cancel: CancelToken,
) -> Vec<TransferOutcome> {
    let mut outcomes = Vec::new();
    loop {
        let mut pending = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            pending = jobs.park() => match pending {
                Some(pending) => pending,
                None => break,
            },
        };
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            job = pending.wait() => Some(job),
        };
        let job = match job {
            Some(Some(job)) => job,
            Some(None) => break,
            None => {
                // The job may already sit in the slot.
                if let Some(job) = pending.withdraw() {
                    debug!(worker, cid = %job.id, "job cancelled before start");
                    outcomes.push(TransferOutcome::cancelled(job.id));
                }
                break;
            }
        };

        if cancel.is_cancelled() {
            outcomes.push(TransferOutcome::cancelled(job.id));
            break;
        }

        debug!(worker, cid = %job.id, "job started");
        let run = AssertUnwindSafe(transfer.execute(&job)).catch_unwind();
        let outcome = match cancel.run_until_cancelled(run).await {
            Some(Ok(outcome)) => outcome,
            Some(Err(panic)) => {
                let reason = panic_message(panic.as_ref());
                error!(worker, cid = %job.id, reason = %reason, "transfer panicked");
                TransferOutcome::failed(job.id.clone(), TransferError::Panicked(reason))
            }
            None => {
                debug!(worker, cid = %job.id, "transfer abandoned on cancel");
                TransferOutcome::cancelled(job.id.clone())
            }
        };
        outcomes.push(outcome);
    }
    debug!(worker, "worker exiting");
    outcomes
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
