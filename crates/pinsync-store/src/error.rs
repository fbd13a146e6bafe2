use pinsync_types::ContentId;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend has no content for the requested identifier.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// The request could not be delivered or the response was not usable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend refused our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend answered with a body we could not decode.
    #[error("decode error: {0}")]
    Decode(String),

    /// The backend received the content but refused to store it.
    #[error("import of {id} rejected: {reason}")]
    Rejected { id: ContentId, reason: String },

    /// The store handle was constructed with unusable settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while reading or writing a content stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Authentication failures will not clear up by themselves.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
