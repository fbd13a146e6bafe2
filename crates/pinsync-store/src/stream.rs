use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

/// Owned stream of content bytes.
///
/// Returned by [`ContentStore::export`](crate::ContentStore::export) and
/// consumed by [`ContentStore::import`](crate::ContentStore::import). Dropping
/// the stream releases whatever backs it (an HTTP response body, a buffer).
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Default chunk size used when turning a buffer into a stream.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Stream a buffer in chunks of `chunk_size` bytes.
pub fn from_bytes(data: Bytes, chunk_size: usize) -> ByteStream {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<io::Result<Bytes>> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
        .collect();
    Box::pin(stream::iter(chunks))
}

/// A stream that fails immediately with `err`.
pub fn failing(err: io::Error) -> ByteStream {
    Box::pin(stream::once(async move { Err(err) }))
}

/// Drain a stream into one contiguous buffer.
pub async fn collect(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
