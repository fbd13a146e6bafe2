//! Unbuffered job hand-off between the coordinator and the worker pool.
//!
//! An idle worker parks a one-shot slot in a shared channel and waits on it;
//! the coordinator takes the next parked slot and fills it. A job therefore
//! only leaves the coordinator when a worker is ready to run it, and the
//! coordinator blocks while every worker is busy.

use tokio::sync::{mpsc, oneshot};

use crate::types::SyncJob;

type Slot = oneshot::Sender<SyncJob>;

/// Create a queue for a pool of `workers` consumers.
pub fn job_queue(workers: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(workers.max(1));
    (JobSender { idle: rx }, JobReceiver { idle: tx })
}

/// Producer half, owned by the coordinator. Dropping it closes the queue.
#[derive(Debug)]
pub struct JobSender {
    idle: mpsc::Receiver<Slot>,
}

impl JobSender {
    /// Hand `job` to the next idle worker, waiting until one is available.
    ///
    /// Returns the job back if every receiver is gone.
    pub async fn send(&mut self, mut job: SyncJob) -> Result<(), SyncJob> {
        loop {
            let Some(slot) = self.idle.recv().await else {
                return Err(job);
            };
            match slot.send(job) {
                Ok(()) => return Ok(()),
                // The worker stopped waiting; offer the job to the next one.
                Err(returned) => job = returned,
            }
        }
    }
}

/// Consumer half, cloned into each worker.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    idle: mpsc::Sender<Slot>,
}

impl JobReceiver {
    /// Park a slot for this worker. `None` once the sender is dropped.
    ///
    /// Dropping this future before it resolves parks nothing.
    pub async fn park(&self) -> Option<PendingJob> {
        let (tx, rx) = oneshot::channel();
        self.idle.send(tx).await.ok()?;
        Some(PendingJob { rx })
    }

    /// Park a slot and wait for the job placed in it.
    pub async fn recv(&self) -> Option<SyncJob> {
        self.park().await?.wait().await
    }
}

/// A parked slot. The job handed to it is kept until it is waited on or
/// withdrawn, so giving up on a slot never loses a job silently.
#[derive(Debug)]
pub struct PendingJob {
    rx: oneshot::Receiver<SyncJob>,
}

impl PendingJob {
    /// Wait for the job. `None` once the sender is dropped.
    ///
    /// Cancel safe: dropping this future leaves any delivered job in the slot.
    pub async fn wait(&mut self) -> Option<SyncJob> {
        (&mut self.rx).await.ok()
    }

    /// Close the slot and return the job already placed in it, if any.
    /// Once closed, the sender offers later jobs to other workers.
    pub fn withdraw(mut self) -> Option<SyncJob> {
        self.rx.close();
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinsync_types::ContentId;
    use std::time::Duration;

    fn job(seed: &str) -> SyncJob {
        SyncJob::new(ContentId::for_content(seed.as_bytes()))
    }

    #[tokio::test(start_paused = true)]
    async fn send_blocks_without_idle_worker() {
        let (mut tx, _rx) = job_queue(2);
        let sent = tokio::time::timeout(Duration::from_secs(5), tx.send(job("a"))).await;
        assert!(sent.is_err());
    }

    #[tokio::test]
    async fn idle_worker_receives_job() {
        let (mut tx, rx) = job_queue(1);
        let worker = tokio::spawn(async move { rx.recv().await });
        tx.send(job("a")).await.unwrap();
        assert_eq!(worker.await.unwrap(), Some(job("a")));
    }

    #[tokio::test]
    async fn recv_ends_when_sender_dropped() {
        let (tx, rx) = job_queue(1);
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn send_fails_when_all_receivers_dropped() {
        let (mut tx, rx) = job_queue(1);
        drop(rx);
        assert_eq!(tx.send(job("a")).await, Err(job("a")));
    }

    #[tokio::test]
    async fn abandoned_wait_does_not_lose_job() {
        let (mut tx, rx) = job_queue(2);

        // Park a slot, then give up on it.
        let abandoned = rx.clone();
        let waiting = tokio::spawn(async move { abandoned.recv().await });
        tokio::task::yield_now().await;
        waiting.abort();
        let _ = waiting.await;

        let worker = tokio::spawn(async move { rx.recv().await });
        tx.send(job("b")).await.unwrap();
        assert_eq!(worker.await.unwrap(), Some(job("b")));
    }

    #[tokio::test]
    async fn withdraw_returns_delivered_job() {
        let (mut tx, rx) = job_queue(1);
        let pending = rx.park().await.unwrap();
        tx.send(job("a")).await.unwrap();
        assert_eq!(pending.withdraw(), Some(job("a")));
    }

    #[tokio::test]
    async fn withdrawn_slot_passes_job_on() {
        let (mut tx, rx) = job_queue(2);
        let empty = rx.park().await.unwrap();
        assert_eq!(empty.withdraw(), None);

        let worker = tokio::spawn(async move { rx.recv().await });
        tx.send(job("b")).await.unwrap();
        assert_eq!(worker.await.unwrap(), Some(job("b")));
    }

    #[tokio::test]
    async fn each_job_delivered_once() {
        let (mut tx, rx) = job_queue(3);
        let mut workers = Vec::new();
        for _ in 0..3 {
            let rx = rx.clone();
            workers.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(job) = rx.recv().await {
                    got.push(job);
                }
                got
            }));
        }
        drop(rx);
        for i in 0..30 {
            tx.send(job(&i.to_string())).await.unwrap();
        }
        drop(tx);
        let mut total = Vec::new();
        for w in workers {
            total.extend(w.await.unwrap());
        }
        assert_eq!(total.len(), 30);
        total.sort_by(|a, b| a.id.cmp(&b.id));
        total.dedup();
        assert_eq!(total.len(), 30);
    }
}
