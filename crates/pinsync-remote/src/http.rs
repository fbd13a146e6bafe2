//! Plumbing shared by the HTTP backends.

use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use pinsync_store::{ByteStream, StoreError, StoreResult};
use pinsync_types::ContentId;
use reqwest::{Client, Response, StatusCode};

/// Per-request timeout. Exports of large DAGs stream for a long time.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Longest error body quoted back in an error message.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client() -> StoreResult<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))
}

/// Normalise a base URL: required, no trailing slash.
pub(crate) fn base_url(url: &str, what: &str) -> StoreResult<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(StoreError::Config(format!("{what} url is required")));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(StoreError::Config(format!("{what} url must be http(s): {url}")));
    }
    Ok(url.to_string())
}

pub(crate) fn transport(err: reqwest::Error) -> StoreError {
    match err.status() {
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => StoreError::Auth(err.to_string()),
        _ => StoreError::Transport(err.to_string()),
    }
}

/// What went wrong with a non-2xx response.
pub(crate) struct Failure {
    pub status: StatusCode,
    pub body: String,
}

impl Failure {
    pub fn is_auth(&self) -> bool {
        matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    }

    pub fn describe(&self, op: &str) -> String {
        if self.body.is_empty() {
            format!("{op}: status {}", self.status)
        } else {
            format!("{op}: status {}: {}", self.status, self.body)
        }
    }

    /// Auth or transport error for list-style operations.
    pub fn into_error(self, op: &str) -> StoreError {
        if self.is_auth() {
            StoreError::Auth(self.describe(op))
        } else {
            StoreError::Transport(self.describe(op))
        }
    }

    /// Auth, not-found or transport error for an export.
    pub fn into_export_error(self, id: &ContentId) -> StoreError {
        if self.status == StatusCode::NOT_FOUND {
            StoreError::NotFound(id.clone())
        } else {
            self.into_error("export")
        }
    }

    /// Auth or rejection error for an import.
    pub fn into_import_error(self, id: &ContentId) -> StoreError {
        if self.is_auth() {
            StoreError::Auth(self.describe("import"))
        } else {
            StoreError::Rejected {
                id: id.clone(),
                reason: self.describe("import"),
            }
        }
    }
}

/// Pass through a 2xx response, or read the error body of any other.
pub(crate) async fn check(resp: Response) -> Result<Response, Failure> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().await.unwrap_or_default();
    body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
    Err(Failure {
        status,
        body: body.trim().to_string(),
    })
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0)
}

/// Turn a response body into a [`ByteStream`]. Dropping the stream closes
/// the connection.
pub(crate) fn body_stream(resp: Response) -> ByteStream {
    Box::pin(resp.bytes_stream().map_err(io::Error::other))
}

/// Request body fed from a [`ByteStream`].
///
/// The mutex only exists to make the body `Sync`; it is never contended
/// because polling takes `&mut self`.
pub(crate) struct UploadStream {
    inner: Mutex<ByteStream>,
}

impl UploadStream {
    pub fn new(content: ByteStream) -> Self {
        Self {
            inner: Mutex::new(content),
        }
    }

    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(self)
    }
}

impl Stream for UploadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = match self.get_mut().inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.poll_next_unpin(cx)
    }
}
