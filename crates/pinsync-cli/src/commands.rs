use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use pinsync_remote::{KuboStore, PinningServiceStore};
use pinsync_store::ContentStore;
use pinsync_sync::{CancelSignal, CancelToken, PassReport, SyncCoordinator, SyncDriver, SyncError};
use pinsync_types::ContentId;
use serde::Serialize;
use tracing::info;

use crate::cli::*;
use crate::config::{Direction, SyncConfig};

pub async fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let interval = match &cli.command {
        Command::Run(args) => args.interval_secs,
        _ => None,
    };
    let config = resolve_config(&cli, interval)?;
    let coordinators = connect(&config)?;

    let signal = CancelSignal::new();
    let cancel = signal.token();
    install_signal_handlers(signal).context("failed to install signal handlers")?;

    match cli.command {
        Command::Run(_) => cmd_run(&config, coordinators, cancel, &cli.format).await,
        Command::Once => cmd_once(coordinators, &cancel, &cli.format).await,
        Command::Diff => cmd_diff(coordinators, &cancel, &cli.format).await,
    }
}

fn resolve_config(cli: &Cli, interval_secs: Option<u64>) -> anyhow::Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    cli.connection.apply(&mut config);
    if let Some(secs) = interval_secs {
        config.interval_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

/// One coordinator per configured direction, node-to-service first.
fn connect(config: &SyncConfig) -> anyhow::Result<Vec<SyncCoordinator>> {
    let ipfs: Arc<dyn ContentStore> = Arc::new(KuboStore::new(&config.ipfs_url)?);
    let estuary: Arc<dyn ContentStore> =
        Arc::new(PinningServiceStore::new(config.pinning_service())?);

    let pairs = match config.direction {
        Direction::IpfsToEstuary => vec![(ipfs, estuary)],
        Direction::EstuaryToIpfs => vec![(estuary, ipfs)],
        Direction::Both => vec![
            (Arc::clone(&ipfs), Arc::clone(&estuary)),
            (estuary, ipfs),
        ],
    };
    Ok(pairs
        .into_iter()
        .map(|(src, dst)| SyncCoordinator::new(src, dst).with_workers(config.workers))
        .collect())
}

#[cfg(unix)]
fn install_signal_handlers(signal: CancelSignal) -> std::io::Result<()> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut sigterm = unix_signal(SignalKind::terminate())?;
    let mut sigint = unix_signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        signal.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(signal: CancelSignal) -> std::io::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C");
            signal.cancel();
        }
    });
    Ok(())
}

async fn cmd_run(
    config: &SyncConfig,
    coordinators: Vec<SyncCoordinator>,
    cancel: CancelToken,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let driver = coordinators
        .into_iter()
        .fold(SyncDriver::new(config.interval()), SyncDriver::with_coordinator);
    if matches!(format, OutputFormat::Text) {
        println!(
            "{} Syncing every {}s with {} workers ({})",
            "▶".green().bold(),
            config.interval_secs,
            config.workers,
            directions(&driver).join(", ").bold()
        );
    }

    let stats = driver.run(cancel).await;
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "passes": stats.passes, "failed_passes": stats.failed_passes })
        ),
        OutputFormat::Text => println!(
            "{} Stopped after {} passes ({} failed)",
            "■".yellow().bold(),
            stats.passes,
            stats.failed_passes
        ),
    }
    Ok(ExitCode::SUCCESS)
}

fn directions(driver: &SyncDriver) -> Vec<String> {
    driver.coordinators().iter().map(SyncCoordinator::label).collect()
}

/// Outcome of one direction in `once`: a finished pass or the error that
/// aborted it.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PassEntry {
    Finished(PassReport),
    Aborted {
        source: String,
        destination: String,
        error: String,
    },
}

impl PassEntry {
    fn aborted(coordinator: &SyncCoordinator, err: &SyncError) -> Self {
        let (source, destination) = coordinator.endpoints();
        Self::Aborted {
            source: source.to_string(),
            destination: destination.to_string(),
            error: err.to_string(),
        }
    }

    fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Run one pass per coordinator. Stops early once cancelled.
async fn run_passes(coordinators: &[SyncCoordinator], cancel: &CancelToken) -> Vec<PassEntry> {
    let mut entries = Vec::with_capacity(coordinators.len());
    for coordinator in coordinators {
        match coordinator.run(cancel).await {
            Ok(report) => entries.push(PassEntry::Finished(report)),
            Err(err) => {
                entries.push(PassEntry::aborted(coordinator, &err));
                if matches!(err, SyncError::Cancelled) {
                    break;
                }
            }
        }
    }
    entries
}

async fn cmd_once(
    coordinators: Vec<SyncCoordinator>,
    cancel: &CancelToken,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let entries = run_passes(&coordinators, cancel).await;
    let aborted = entries.iter().any(PassEntry::is_aborted);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for entry in &entries {
                match entry {
                    PassEntry::Finished(report) => print_report(report),
                    PassEntry::Aborted {
                        source,
                        destination,
                        error,
                    } => println!(
                        "{} {} -> {}: {}",
                        "✗".red().bold(),
                        source.bold(),
                        destination.bold(),
                        error
                    ),
                }
            }
        }
    }
    Ok(if aborted { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn print_report(report: &PassReport) {
    let mark = if report.is_complete() {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    println!(
        "{} {} -> {}: {} missing, {} copied, {} failed ({} bytes, {} ms)",
        mark,
        report.source.bold(),
        report.destination.bold(),
        report.missing,
        report.succeeded.to_string().green(),
        report.failed().to_string().red(),
        report.bytes_transferred,
        report.elapsed_ms
    );
    for failure in &report.failures {
        println!("  {} {}: {}", "failed:".red(), failure.id.to_string().yellow(), failure.reason);
    }
    if report.cancelled_jobs > 0 || report.cancelled {
        println!("  {} {} jobs abandoned", "cancelled:".yellow(), report.cancelled_jobs);
    }
}

#[derive(Serialize)]
struct DiffReport {
    source: String,
    destination: String,
    source_count: usize,
    destination_count: usize,
    missing: Vec<ContentId>,
}

async fn cmd_diff(
    coordinators: Vec<SyncCoordinator>,
    cancel: &CancelToken,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let mut diffs = Vec::with_capacity(coordinators.len());
    for coordinator in &coordinators {
        let plan = coordinator
            .plan(cancel)
            .await
            .with_context(|| format!("failed to diff {}", coordinator.label()))?;
        let (source, destination) = coordinator.endpoints();
        let mut missing = plan.missing;
        missing.sort();
        diffs.push(DiffReport {
            source: source.to_string(),
            destination: destination.to_string(),
            source_count: plan.source.len(),
            destination_count: plan.destination.len(),
            missing,
        });
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diffs)?),
        OutputFormat::Text => {
            for diff in &diffs {
                println!(
                    "{} -> {}: {} of {} pins missing ({} at destination)",
                    diff.source.bold(),
                    diff.destination.bold(),
                    diff.missing.len().to_string().yellow(),
                    diff.source_count,
                    diff.destination_count
                );
                for id in &diff.missing {
                    println!("  {} {}", "+".green(), id);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinsync_store::InMemoryContentStore;

    fn coordinators() -> Vec<SyncCoordinator> {
        let ipfs = Arc::new(InMemoryContentStore::new("ipfs"));
        let estuary = Arc::new(InMemoryContentStore::new("estuary"));
        ipfs.insert(&b"only on the node"[..]);
        vec![
            SyncCoordinator::new(ipfs.clone(), estuary.clone()),
            SyncCoordinator::new(estuary, ipfs),
        ]
    }

    #[tokio::test]
    async fn finished_passes_serialize_as_reports() {
        let entries = run_passes(&coordinators(), &CancelToken::never()).await;
        assert_eq!(entries.len(), 2);
        assert!(!entries.iter().any(PassEntry::is_aborted));

        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["source"], "ipfs");
        assert_eq!(json[0]["succeeded"], 1);
        assert!(json[0].get("error").is_none());
    }

    #[tokio::test]
    async fn aborted_pass_is_reported_in_json() {
        let signal = CancelSignal::new();
        signal.cancel();
        let entries = run_passes(&coordinators(), &signal.token()).await;

        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_aborted());
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json[0]["source"], "ipfs");
        assert_eq!(json[0]["destination"], "estuary");
        assert_eq!(json[0]["error"], "sync pass cancelled");
    }
}
