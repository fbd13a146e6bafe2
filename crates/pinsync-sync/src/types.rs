use std::time::Duration;

use pinsync_types::ContentId;
use serde::Serialize;

use crate::error::TransferError;

/// One identifier earmarked for transfer in the current pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncJob {
    pub id: ContentId,
}

impl SyncJob {
    pub fn new(id: ContentId) -> Self {
        Self { id }
    }
}

/// Result of executing one [`SyncJob`]. `Ok` carries the bytes moved.
#[derive(Debug)]
pub struct TransferOutcome {
    pub id: ContentId,
    pub result: Result<u64, TransferError>,
}

impl TransferOutcome {
    pub fn succeeded(id: ContentId, bytes: u64) -> Self {
        Self { id, result: Ok(bytes) }
    }

    pub fn failed(id: ContentId, error: TransferError) -> Self {
        Self { id, result: Err(error) }
    }

    pub fn cancelled(id: ContentId) -> Self {
        Self::failed(id, TransferError::Cancelled)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A failed transfer as it appears in a [`PassReport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub id: ContentId,
    pub reason: String,
}

/// Summary of one sync pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PassReport {
    pub source: String,
    pub destination: String,
    pub source_count: usize,
    pub destination_count: usize,
    pub missing: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub bytes_transferred: u64,
    pub failures: Vec<TransferFailure>,
    /// Dispatched jobs that never ran, or were abandoned, because the pass
    /// was cancelled.
    pub cancelled_jobs: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl PassReport {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Fold worker outcomes into the report.
    pub fn record(&mut self, outcomes: impl IntoIterator<Item = TransferOutcome>) {
        for outcome in outcomes {
            match outcome.result {
                Ok(bytes) => {
                    self.succeeded += 1;
                    self.bytes_transferred += bytes;
                }
                Err(TransferError::Cancelled) => self.cancelled_jobs += 1,
                Err(err) => self.failures.push(TransferFailure {
                    id: outcome.id,
                    reason: err.to_string(),
                }),
            }
        }
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Every missing identifier was copied.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.succeeded == self.missing
    }
}
