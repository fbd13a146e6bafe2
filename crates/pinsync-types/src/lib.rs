//! Foundation types for pinsync.
//!
//! Every other pinsync crate depends on `pinsync-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Canonical textual CID naming a pinned DAG
//! - [`ContentSet`] -- Snapshot of identifiers a backend reports as retained
//! - [`PinStatus`] -- Pin lifecycle state reported by a backend

pub mod content_id;
pub mod content_set;
pub mod error;
pub mod pin;

pub use content_id::ContentId;
pub use content_set::ContentSet;
pub use error::TypeError;
pub use pin::PinStatus;
