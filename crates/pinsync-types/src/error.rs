use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty content identifier")]
    EmptyContentId,

    #[error("invalid content identifier {value:?}: {reason}")]
    InvalidContentId { value: String, reason: String },

    #[error("unknown pin status: {0}")]
    UnknownPinStatus(String),
}
