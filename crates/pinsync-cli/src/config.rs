use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pinsync_remote::PinningServiceConfig;
use pinsync_sync::{DEFAULT_INTERVAL, DEFAULT_WORKERS};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ESTUARY_URL: &str = "https://api.estuary.tech";
pub const DEFAULT_GATEWAY_URL: &str = "https://dweb.link";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{field} is required (set {env} or --{flag})")]
    Missing {
        field: &'static str,
        env: &'static str,
        flag: &'static str,
    },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Which way pins flow.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Copy node pins to the pinning service.
    #[default]
    IpfsToEstuary,
    /// Copy pinning-service pins to the node.
    EstuaryToIpfs,
    /// One pass each way, node first.
    Both,
}

/// Everything the binary needs to run a sync.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub ipfs_url: String,
    pub estuary_url: String,
    pub estuary_api_key: String,
    pub gateway_url: String,
    pub workers: usize,
    pub interval_secs: u64,
    pub direction: Direction,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ipfs_url: String::new(),
            estuary_url: DEFAULT_ESTUARY_URL.into(),
            estuary_api_key: String::new(),
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            workers: DEFAULT_WORKERS,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            direction: Direction::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ipfs_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "ipfs_url",
                env: "IPFS_HOST",
                flag: "ipfs-url",
            });
        }
        if self.estuary_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "estuary_api_key",
                env: "ESTUARY_API_KEY",
                flag: "estuary-api-key",
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero { field: "workers" });
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Zero { field: "interval_secs" });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pinning_service(&self) -> PinningServiceConfig {
        PinningServiceConfig::new(&self.estuary_url, &self.estuary_api_key)
            .with_gateway(&self.gateway_url)
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("ipfs_url", &self.ipfs_url)
            .field("estuary_url", &self.estuary_url)
            .field("estuary_api_key", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .field("workers", &self.workers)
            .field("interval_secs", &self.interval_secs)
            .field("direction", &self.direction)
            .finish()
    }
}
