use pinsync_store::StoreError;
use thiserror::Error;

/// Errors that abort a whole sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to list pins on {store}: {source}")]
    List { store: String, source: StoreError },

    #[error("sync pass cancelled")]
    Cancelled,
}

/// Errors scoped to a single identifier's transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("export failed: {0}")]
    Export(#[source] StoreError),

    #[error("import failed: {0}")]
    Import(#[source] StoreError),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("transfer panicked: {0}")]
    Panicked(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
