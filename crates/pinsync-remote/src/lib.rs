//! HTTP content stores for pinsync.
//!
//! - [`KuboStore`] talks to an IPFS node's RPC API (`/api/v0`).
//! - [`PinningServiceStore`] talks to an IPFS Pinning Service API such as
//!   Estuary, exporting through a public gateway.
//!
//! Both map HTTP failures onto [`StoreError`](pinsync_store::StoreError):
//! 401/403 become `Auth`, a missing export becomes `NotFound`, a refused
//! import becomes `Rejected`, and anything else on the wire is `Transport`.

mod http;
pub mod kubo;
pub mod pinning;

pub use http::REQUEST_TIMEOUT;
pub use kubo::KuboStore;
pub use pinning::{PinningServiceConfig, PinningServiceStore, PAGE_LIMIT};
