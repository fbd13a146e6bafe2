use std::collections::HashMap;

use async_trait::async_trait;
use pinsync_store::{ByteStream, ContentStore, StoreError, StoreResult};
use pinsync_types::{ContentId, ContentSet};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{self, UploadStream};

/// `pin/ls` response body.
#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: HashMap<String, IgnoredAny>,
}

/// Content store backed by an IPFS node's HTTP RPC API (Kubo).
///
/// Lists recursive pins, exports DAGs as CAR streams with `dag/export`, and
/// imports CAR streams with `dag/import`, which pins the imported roots.
pub struct KuboStore {
    name: String,
    url: String,
    client: Client,
}

impl KuboStore {
    /// `url` is the RPC base, e.g. `http://127.0.0.1:5001`.
    pub fn new(url: &str) -> StoreResult<Self> {
        Ok(Self {
            name: "ipfs".into(),
            url: http::base_url(url, "ipfs")?,
            client: http::build_client()?,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v0/{path}", self.url)
    }
}

#[async_trait]
impl ContentStore for KuboStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_pinned(&self) -> StoreResult<ContentSet> {
        let resp = self
            .client
            .post(self.endpoint("pin/ls"))
            .query(&[("type", "recursive")])
            .send()
            .await
            .map_err(http::transport)?;
        let resp = http::check(resp).await.map_err(|f| f.into_error("pin/ls"))?;
        let body: PinLsResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("pin/ls: {e}")))?;

        let set: ContentSet = body
            .keys
            .into_keys()
            .filter_map(|cid| match ContentId::parse(&cid) {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(store = %self.name, error = %err, "skipping unparseable pin");
                    None
                }
            })
            .collect();
        debug!(store = %self.name, pins = set.len(), "listed pins");
        Ok(set)
    }

    async fn export(&self, id: &ContentId) -> StoreResult<ByteStream> {
        let resp = self
            .client
            .post(self.endpoint("dag/export"))
            .query(&[("arg", id.as_str())])
            .send()
            .await
            .map_err(http::transport)?;
        let resp = http::check(resp)
            .await
            .map_err(|f| f.into_export_error(id))?;
        Ok(http::body_stream(resp))
    }

    async fn import(&self, id: &ContentId, content: ByteStream) -> StoreResult<()> {
        let part = Part::stream(UploadStream::new(content).into_body()).file_name(id.to_string());
        let form = Form::new().part("path", part);
        let resp = self
            .client
            .post(self.endpoint("dag/import"))
            .multipart(form)
            .send()
            .await
            .map_err(http::transport)?;
        http::check(resp)
            .await
            .map_err(|f| f.into_import_error(id))?;
        Ok(())
    }
}

impl std::fmt::Debug for KuboStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuboStore")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish()
    }
}
