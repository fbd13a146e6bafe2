use async_trait::async_trait;
use pinsync_store::{ByteStream, ContentStore, StoreError, StoreResult};
use pinsync_types::{ContentId, ContentSet, PinStatus};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http::{self, UploadStream};

/// Largest page the Pinning Service API allows.
pub const PAGE_LIMIT: usize = 1000;

/// Connection settings for a pinning service.
#[derive(Clone, Serialize, Deserialize)]
pub struct PinningServiceConfig {
    /// API base, e.g. `https://api.estuary.tech`.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Gateway used to export content as CAR streams.
    pub gateway_url: String,
}

impl PinningServiceConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            gateway_url: "https://dweb.link".into(),
        }
    }

    pub fn with_gateway(mut self, gateway_url: impl Into<String>) -> Self {
        self.gateway_url = gateway_url.into();
        self
    }
}

impl std::fmt::Debug for PinningServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningServiceConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PinResults {
    count: usize,
    #[serde(default)]
    results: Vec<PinStatusRecord>,
}

#[derive(Debug, Deserialize)]
struct PinStatusRecord {
    status: String,
    created: String,
    pin: PinRecord,
}

#[derive(Debug, Deserialize)]
struct PinRecord {
    cid: String,
}

/// Content store backed by an IPFS Pinning Service API (Estuary).
///
/// Pins are listed through `/pinning/pins`, content is exported as a CAR
/// stream from a public gateway, and imported by uploading the CAR to
/// `/content/add-car`.
pub struct PinningServiceStore {
    name: String,
    api_url: String,
    api_key: String,
    gateway_url: String,
    client: Client,
}

impl PinningServiceStore {
    pub fn new(config: PinningServiceConfig) -> StoreResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(StoreError::Config("pinning service api key is required".into()));
        }
        Ok(Self {
            name: "estuary".into(),
            api_url: http::base_url(&config.api_url, "pinning service")?,
            api_key: config.api_key,
            gateway_url: http::base_url(&config.gateway_url, "gateway")?,
            client: http::build_client()?,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.api_key)
    }

    async fn fetch_page(&self, before: Option<&str>) -> StoreResult<PinResults> {
        let limit = PAGE_LIMIT.to_string();
        let mut query: Vec<(&str, &str)> = vec![("status", "pinned"), ("limit", &limit)];
        if let Some(before) = before {
            query.push(("before", before));
        }
        let req = self
            .client
            .get(format!("{}/pinning/pins", self.api_url))
            .query(&query);
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(http::transport)?;
        let resp = http::check(resp)
            .await
            .map_err(|f| f.into_error("list pins"))?;
        resp.json()
            .await
            .map_err(|e| StoreError::Decode(format!("list pins: {e}")))
    }
}

#[async_trait]
impl ContentStore for PinningServiceStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_pinned(&self) -> StoreResult<ContentSet> {
        let mut ids = Vec::new();
        let mut seen = 0usize;
        let mut before: Option<String> = None;

        loop {
            let page = self.fetch_page(before.as_deref()).await?;
            if page.results.is_empty() {
                break;
            }
            seen += page.results.len();
            let full_page = page.results.len() >= PAGE_LIMIT;
            let oldest = page.results.iter().map(|r| r.created.clone()).min();

            for record in page.results {
                let retained = record
                    .status
                    .parse::<PinStatus>()
                    .is_ok_and(PinStatus::is_retained);
                if !retained {
                    continue;
                }
                match ContentId::parse(&record.pin.cid) {
                    Ok(id) => ids.push(id),
                    Err(err) => {
                        warn!(store = %self.name, error = %err, "skipping unparseable pin");
                    }
                }
            }

            if seen >= page.count || !full_page || oldest == before {
                break;
            }
            before = oldest;
        }

        let set: ContentSet = ids.into_iter().collect();
        debug!(store = %self.name, pins = set.len(), "listed pins");
        Ok(set)
    }

    async fn export(&self, id: &ContentId) -> StoreResult<ByteStream> {
        let resp = self
            .client
            .get(format!("{}/api/v0/dag/export", self.gateway_url))
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
        let req = self
            .client
            .post(format!("{}/content/add-car", self.api_url))
            .body(UploadStream::new(content).into_body());
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(http::transport)?;
        http::check(resp)
            .await
            .map_err(|f| f.into_import_error(id))?;
        Ok(())
    }
}

impl std::fmt::Debug for PinningServiceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningServiceStore")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}
