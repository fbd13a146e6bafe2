use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Direction, SyncConfig};

#[derive(Parser)]
#[command(
    name = "pinsync",
    about = "Mirror pins between an IPFS node and a pinning service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with sync settings; flags and env vars override it
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sync immediately, then on every interval until interrupted
    Run(RunArgs),
    /// Run a single pass in every configured direction
    Once,
    /// Show what a pass would copy, without copying
    Diff,
}

#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// IPFS node RPC address
    #[arg(long, global = true, env = "IPFS_HOST")]
    pub ipfs_url: Option<String>,

    /// Pinning service API address
    #[arg(long, global = true, env = "ESTUARY_URL")]
    pub estuary_url: Option<String>,

    /// Pinning service API key
    #[arg(long, global = true, env = "ESTUARY_API_KEY", hide_env_values = true)]
    pub estuary_api_key: Option<String>,

    /// Gateway used to export content held by the pinning service
    #[arg(long, global = true, env = "ESTUARY_GATEWAY")]
    pub gateway_url: Option<String>,

    /// Concurrent transfers per pass
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[arg(long, global = true, value_enum)]
    pub direction: Option<Direction>,
}

impl ConnectionArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut SyncConfig) {
        if let Some(url) = &self.ipfs_url {
            config.ipfs_url.clone_from(url);
        }
        if let Some(url) = &self.estuary_url {
            config.estuary_url.clone_from(url);
        }
        if let Some(key) = &self.estuary_api_key {
            config.estuary_api_key.clone_from(key);
        }
        if let Some(url) = &self.gateway_url {
            config.gateway_url.clone_from(url);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(direction) = self.direction {
            config.direction = direction;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Seconds between the start of consecutive passes
    #[arg(long)]
    pub interval_secs: Option<u64>,
}
