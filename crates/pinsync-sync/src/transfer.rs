use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use pinsync_store::{ByteStream, ContentStore};
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::types::{SyncJob, TransferOutcome};

/// Moves one identifier's content from a source store to a destination store.
///
/// The export stream is handed straight to the destination's import, so the
/// payload is never buffered here. The stream is owned by exactly one place
/// at a time and is released when that owner returns, fails or unwinds.
pub struct Transfer {
    source: Arc<dyn ContentStore>,
    destination: Arc<dyn ContentStore>,
}

impl Transfer {
    pub fn new(source: Arc<dyn ContentStore>, destination: Arc<dyn ContentStore>) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub async fn execute(&self, job: &SyncJob) -> TransferOutcome {
        let id = &job.id;
        debug!(cid = %id, source = self.source.name(), "exporting");

        let export = match self.source.export(id).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(cid = %id, source = self.source.name(), error = %err, "export failed");
                return TransferOutcome::failed(id.clone(), TransferError::Export(err));
            }
        };

        debug!(cid = %id, destination = self.destination.name(), "importing");

        let moved = Arc::new(AtomicU64::new(0));
        let content = count_bytes(export, Arc::clone(&moved));
        match self.destination.import(id, content).await {
            Ok(()) => {
                let bytes = moved.load(Ordering::Relaxed);
                info!(cid = %id, bytes, "transferred");
                TransferOutcome::succeeded(id.clone(), bytes)
            }
            Err(err) => {
                warn!(
                    cid = %id,
                    destination = self.destination.name(),
                    error = %err,
                    "import failed"
                );
                TransferOutcome::failed(id.clone(), TransferError::Import(err))
            }
        }
    }
}

fn count_bytes(stream: ByteStream, counter: Arc<AtomicU64>) -> ByteStream {
    Box::pin(stream.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        }
    }))
}
