//! Content store capability for pinsync.
//!
//! The sync engine talks to pinning backends only through the
//! [`ContentStore`] trait: list what is pinned, export content as a byte
//! stream, import a byte stream. Concrete HTTP backends live in
//! `pinsync-remote`; this crate carries the contract and an in-memory
//! implementation.
//!
//! # Storage Backends
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and dry runs
//!
//! # Design Rules
//!
//! 1. Content is addressed by [`ContentId`](pinsync_types::ContentId); the
//!    store never rewrites or interprets the bytes.
//! 2. Streams are owned: whoever holds a [`ByteStream`] is responsible for it,
//!    and dropping it releases the underlying resource.
//! 3. Handles are shared across workers and must tolerate concurrent calls.

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use stream::ByteStream;
pub use traits::ContentStore;
