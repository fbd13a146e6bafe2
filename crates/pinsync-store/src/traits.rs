use async_trait::async_trait;
use pinsync_types::{ContentId, ContentSet};

use crate::error::StoreResult;
use crate::stream::ByteStream;

/// Capability the sync engine needs from a pinning backend.
///
/// All implementations must satisfy these invariants:
/// - `list_pinned` reports only content the backend affirms as retained.
///   Queued, in-progress and failed pins are excluded.
/// - Every operation is safe to call concurrently on one shared handle.
/// - Every operation is cancel-safe: dropping the returned future aborts the
///   underlying request and leaves the handle usable.
/// - The store never interprets content bytes; it only moves them.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short label for logs ("kubo", "estuary", ...).
    fn name(&self) -> &str;

    /// Enumerate the identifiers currently retained by the backend.
    async fn list_pinned(&self) -> StoreResult<ContentSet>;

    /// Open the content behind `id` as a byte stream.
    ///
    /// The caller owns the stream; dropping it releases the response.
    async fn export(&self, id: &ContentId) -> StoreResult<ByteStream>;

    /// Consume `content` and durably store it under `id`.
    ///
    /// Returns once the backend has acknowledged the upload.
    async fn import(&self, id: &ContentId, content: ByteStream) -> StoreResult<()>;
}
