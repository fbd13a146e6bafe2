//! Reconciliation and concurrent transfer engine for pinsync.
//!
//! A pass lists the pins on a source and a destination [`ContentStore`],
//! computes which identifiers the destination lacks, and copies them across
//! with a bounded pool of workers. Failures are isolated per identifier;
//! only a failure to list either side aborts the pass. Nothing is carried
//! over between passes: every pass recomputes the full difference.
//!
//! [`ContentStore`]: pinsync_store::ContentStore

pub mod cancel;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod pool;
pub mod queue;
pub mod reconcile;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod testing;

pub use cancel::{CancelSignal, CancelToken};
pub use coordinator::{SyncCoordinator, SyncPlan};
pub use driver::{DriverStats, SyncDriver, DEFAULT_INTERVAL};
pub use error::{SyncError, SyncResult, TransferError};
pub use pool::{WorkerPool, DEFAULT_WORKERS};
pub use queue::{job_queue, JobReceiver, JobSender, PendingJob};
pub use reconcile::Reconciler;
pub use transfer::Transfer;
pub use types::{PassReport, SyncJob, TransferFailure, TransferOutcome};
