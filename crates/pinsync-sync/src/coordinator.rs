use std::sync::Arc;
use std::time::Instant;

use pinsync_store::ContentStore;
use pinsync_types::{ContentId, ContentSet};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{SyncError, SyncResult};
use crate::pool::{WorkerPool, DEFAULT_WORKERS};
use crate::queue::job_queue;
use crate::reconcile::Reconciler;
use crate::transfer::Transfer;
use crate::types::{PassReport, SyncJob};

/// Snapshots and diff computed at the start of a pass.
#[derive(Clone, Debug)]
pub struct SyncPlan {
    pub source: ContentSet,
    pub destination: ContentSet,
    pub missing: Vec<ContentId>,
}

/// Runs one-way sync passes from a source store to a destination store.
///
/// A pass lists both stores, computes what the destination lacks, and feeds
/// those identifiers one at a time to a fixed pool of workers. Dispatch blocks
/// while every worker is busy. `run` returns after the pool has drained, so a
/// report always describes finished transfers.
pub struct SyncCoordinator {
    source: Arc<dyn ContentStore>,
    destination: Arc<dyn ContentStore>,
    workers: usize,
}

impl SyncCoordinator {
    pub fn new(source: Arc<dyn ContentStore>, destination: Arc<dyn ContentStore>) -> Self {
        Self {
            source,
            destination,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Names of the source and destination stores.
    pub fn endpoints(&self) -> (&str, &str) {
        (self.source.name(), self.destination.name())
    }

    /// "source -> destination", for logs and reports.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source.name(), self.destination.name())
    }

    /// List both stores and compute the missing identifiers.
    pub async fn plan(&self, cancel: &CancelToken) -> SyncResult<SyncPlan> {
        let fetch = async {
            tokio::try_join!(
                list(self.source.as_ref()),
                list(self.destination.as_ref())
            )
        };
        let (source, destination) = cancel
            .run_until_cancelled(fetch)
            .await
            .ok_or(SyncError::Cancelled)??;
        let missing = Reconciler::compute_missing(&source, &destination);
        Ok(SyncPlan {
            source,
            destination,
            missing,
        })
    }

    /// Perform one full pass.
    pub async fn run(&self, cancel: &CancelToken) -> SyncResult<PassReport> {
        let started = Instant::now();
        let mut report = PassReport::new(self.source.name(), self.destination.name());
        info!(pass = %self.label(), "starting sync pass");

        let plan = self.plan(cancel).await.inspect_err(|err| {
            warn!(pass = %self.label(), error = %err, "sync pass aborted");
        })?;
        report.source_count = plan.source.len();
        report.destination_count = plan.destination.len();
        report.missing = plan.missing.len();
        info!(
            pass = %self.label(),
            source = report.source_count,
            destination = report.destination_count,
            missing = report.missing,
            "pin sets fetched"
        );

        if plan.missing.is_empty() {
            report.set_elapsed(started.elapsed());
            info!(pass = %self.label(), "already in sync");
            return Ok(report);
        }

        let transfer = Arc::new(Transfer::new(
            Arc::clone(&self.source),
            Arc::clone(&self.destination),
        ));
        let (mut jobs, receiver) = job_queue(self.workers);
        let pool = WorkerPool::spawn(self.workers, transfer, receiver, cancel.clone());
        debug!(pass = %self.label(), workers = pool.size(), "dispatching");

        for id in plan.missing {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                sent = jobs.send(SyncJob::new(id)) => Some(sent),
            };
            match sent {
                Some(Ok(())) => report.dispatched += 1,
                Some(Err(job)) => {
                    warn!(cid = %job.id, "no workers left to accept jobs");
                    break;
                }
                None => break,
            }
        }
        drop(jobs);

        debug!(pass = %self.label(), dispatched = report.dispatched, "draining");
        report.record(pool.join().await);
        report.cancelled = cancel.is_cancelled();
        report.set_elapsed(started.elapsed());

        info!(
            pass = %self.label(),
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed(),
            cancelled = report.cancelled_jobs,
            bytes = report.bytes_transferred,
            elapsed_ms = report.elapsed_ms,
            "sync pass finished"
        );
        Ok(report)
    }
}

async fn list(store: &dyn ContentStore) -> SyncResult<ContentSet> {
    store.list_pinned().await.map_err(|source| SyncError::List {
        store: store.name().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSignal;
    use crate::testing::InstrumentedStore;
    use std::collections::HashSet;
    use std::time::Duration;

    fn stores() -> (Arc<InstrumentedStore>, Arc<InstrumentedStore>) {
        (
            Arc::new(InstrumentedStore::new("src")),
            Arc::new(InstrumentedStore::new("dst")),
        )
    }

    fn coordinator(src: &Arc<InstrumentedStore>, dst: &Arc<InstrumentedStore>) -> SyncCoordinator {
        SyncCoordinator::new(src.clone(), dst.clone())
    }

    #[tokio::test]
    async fn copies_what_destination_lacks() {
        let (src, dst) = stores();
        let a = src.inner().insert(&b"A"[..]);
        let b = src.inner().insert(&b"B"[..]);
        let c = src.inner().insert(&b"C"[..]);
        dst.inner().insert(&b"B"[..]);

        let plan = coordinator(&src, &dst).plan(&CancelToken::never()).await.unwrap();
        let missing: HashSet<_> = plan.missing.iter().cloned().collect();
        assert_eq!(missing, HashSet::from([a.clone(), c.clone()]));

        let report = coordinator(&src, &dst).run(&CancelToken::never()).await.unwrap();
        assert_eq!(report.missing, 2);
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.succeeded, 2);
        assert!(report.is_complete());
        assert_eq!(src.exports_started(), 2);

        let after = dst.list_pinned().await.unwrap();
        assert_eq!(after.len(), 3);
        for id in [&a, &b, &c] {
            assert!(after.contains(id));
        }
    }

    #[tokio::test]
    async fn second_pass_finds_nothing() {
        let (src, dst) = stores();
        for i in 0..5u8 {
            src.inner().insert(vec![i; 8]);
        }
        let coord = coordinator(&src, &dst);
        let first = coord.run(&CancelToken::never()).await.unwrap();
        assert_eq!(first.succeeded, 5);

        let second = coord.run(&CancelToken::never()).await.unwrap();
        assert_eq!(second.missing, 0);
        assert_eq!(second.dispatched, 0);
        assert_eq!(src.exports_started(), 5);
    }

    #[tokio::test]
    async fn partial_failure_is_isolated() {
        let (src, dst) = stores();
        let a = src.inner().insert(&b"A"[..]);
        let b = src.inner().insert(&b"B"[..]);
        src.fail_export(&a);

        let report = coordinator(&src, &dst).run(&CancelToken::never()).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].id, a);
        assert!(!report.is_complete());

        let after = dst.list_pinned().await.unwrap();
        assert!(after.contains(&b));
        assert!(!after.contains(&a));
    }

    #[tokio::test]
    async fn import_failure_does_not_block_siblings() {
        let (src, dst) = stores();
        let ids: Vec<_> = (0..6u8).map(|i| src.inner().insert(vec![i; 4])).collect();
        dst.fail_import(&ids[2]);

        let report = coordinator(&src, &dst)
            .with_workers(2)
            .run(&CancelToken::never())
            .await
            .unwrap();
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].id, ids[2]);
    }

    #[tokio::test]
    async fn list_failure_aborts_before_dispatch() {
        let (src, dst) = stores();
        src.inner().insert(&b"A"[..]);
        dst.fail_list();

        let err = coordinator(&src, &dst).run(&CancelToken::never()).await.unwrap_err();
        assert!(matches!(err, SyncError::List { ref store, .. } if store == "dst"));
        assert_eq!(src.exports_started(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_lists_nothing() {
        let (src, dst) = stores();
        src.inner().insert(&b"A"[..]);
        let signal = CancelSignal::new();
        signal.cancel();

        let err = coordinator(&src, &dst).run(&signal.token()).await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
        assert_eq!(src.exports_started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_pool_size() {
        let (src, dst) = stores();
        for i in 0..20u8 {
            src.inner().insert(vec![i; 32]);
        }
        dst.set_import_delay(Duration::from_millis(100));

        let report = coordinator(&src, &dst)
            .with_workers(4)
            .run(&CancelToken::never())
            .await
            .unwrap();
        assert_eq!(report.succeeded, 20);
        assert_eq!(dst.peak_imports(), 4);
        assert!(src.peak_streams() <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_new_dispatch() {
        let (src, dst) = stores();
        for i in 0..10u8 {
            src.inner().insert(vec![i; 16]);
        }
        dst.set_import_delay(Duration::from_secs(1));

        let signal = CancelSignal::new();
        let token = signal.token();
        let coord = coordinator(&src, &dst).with_workers(2);
        let pass = tokio::spawn(async move { coord.run(&token).await });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        signal.cancel();
        let report = pass.await.unwrap().unwrap();

        // Two waves started: the first finished, the second was abandoned.
        assert!(report.cancelled);
        assert_eq!(report.succeeded, 2);
        assert_eq!(src.exports_started(), 4);
        assert_eq!(report.cancelled_jobs, 2);
        assert_eq!(
            report.dispatched,
            report.succeeded + report.failed() + report.cancelled_jobs
        );
        assert_eq!(src.open_streams(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(src.exports_started(), 4);
    }

    #[test]
    fn label_and_workers() {
        let (src, dst) = stores();
        let coord = coordinator(&src, &dst).with_workers(0);
        assert_eq!(coord.workers(), 1);
        assert_eq!(coord.label(), "src -> dst");
        assert_eq!(coord.endpoints(), ("src", "dst"));
        assert_eq!(coordinator(&src, &dst).workers(), DEFAULT_WORKERS);
    }
}
