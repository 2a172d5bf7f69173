use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use feed_client::buffer::{BufferConfig, DropPolicy};
use feed_client::config::{ClientConfig, NetworkConfig};
use feed_client::control::{
    CalculationResult, ComputeCommand, ComputeEvent, ConnectionStatus, NetworkEvent,
};
use feed_client::drain::DrainConfig;
use feed_client::report::summarize;
use feed_client::FeedClient;
use pnl_core::positions::{generate, PositionConfig};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;
use tracing::{error, info, warn};
use types::directory::Directory;
use types::reference::ReferenceTable;

#[derive(Debug, Parser)]
#[command(name = "feed-client")]
#[command(about = "Price feed consumer with a ranked P&L view", long_about = None)]
struct Args {
    /// Feed WebSocket URL
    #[arg(long, env = "FEED_CLIENT_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Overflow policy of the ingress buffer
    #[arg(long, env = "FEED_CLIENT_DROP_POLICY", default_value = "drop-oldest")]
    drop_policy: DropPolicy,

    /// Ingress buffer capacity
    #[arg(long, env = "FEED_CLIENT_CAPACITY", default_value_t = 100)]
    capacity: usize,

    /// Items kept at each end under drop-middle
    #[arg(long, env = "FEED_CLIENT_KEEP_AT_EDGES", default_value_t = 10)]
    keep_at_edges: usize,

    /// Wall-clock budget per drain slice, in milliseconds
    #[arg(long, env = "FEED_CLIENT_SLICE_MS", default_value_t = 8)]
    slice_ms: u64,

    /// Seed for position generation
    #[arg(long, env = "FEED_CLIENT_POSITION_SEED", default_value_t = 0)]
    position_seed: u64,

    /// Number of symbols to hold
    #[arg(long, env = "FEED_CLIENT_POSITIONS", default_value_t = 12)]
    positions: usize,

    /// Seconds between reports
    #[arg(long, env = "FEED_CLIENT_REPORT_SECS", default_value_t = 1)]
    report_secs: u64,

    /// JSON reference table for entry prices; built-in table when absent
    #[arg(long, env = "FEED_CLIENT_REFERENCE")]
    reference: Option<PathBuf>,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.url.clone(),
            network: NetworkConfig {
                buffer: BufferConfig {
                    capacity: self.capacity,
                    policy: self.drop_policy,
                    keep_at_edges: self.keep_at_edges,
                    ..BufferConfig::default()
                },
                drain: DrainConfig {
                    slice_budget: Duration::from_millis(self.slice_ms),
                },
                ..NetworkConfig::default()
            },
            positions: PositionConfig {
                count: self.positions,
                ..PositionConfig::default()
            },
            position_seed: self.position_seed,
            report_interval: Duration::from_secs(self.report_secs.max(1)),
            ..ClientConfig::default()
        }
    }

    fn reference_table(&self) -> anyhow::Result<ReferenceTable> {
        match &self.reference {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading reference table {}", path.display()))?;
                ReferenceTable::from_json(&json)
                    .with_context(|| format!("parsing reference table {}", path.display()))
            }
            None => Ok(ReferenceTable::builtin()),
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn log_report(result: &CalculationResult, directory: &Directory, rows: usize) -> anyhow::Result<()> {
    let report = summarize(result, directory, rows);
    info!(
        total_pl = report.aggregates.total_pl,
        total_pl_pct = report.aggregates.total_pl_pct,
        wins = report.aggregates.win_count,
        losses = report.aggregates.loss_count,
        session_pl = report.session.total_pl,
        "Portfolio"
    );
    info!(
        losers = %serde_json::to_string(&report.losers)?,
        gainers = %serde_json::to_string(&report.gainers)?,
        "Top movers"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.client_config();
    config
        .network
        .buffer
        .validate()
        .context("invalid buffer configuration")?;
    let reference = args.reference_table()?;

    let mut client = FeedClient::start(config.network.clone());
    let mut events = client.network.subscribe();
    client.network.connect(config.url.clone()).await?;

    let mut directory: Option<Directory> = None;
    let mut latest: Option<CalculationResult> = None;
    let mut report = interval(config.report_interval);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(NetworkEvent::Directory(received)) => {
                    match generate(&received, &reference, &config.positions, config.position_seed) {
                        Ok(positions) => {
                            info!(held = positions.len(), "Positions generated");
                            client
                                .compute
                                .send(ComputeCommand::SetPositions(positions))
                                .context("compute domain stopped")?;
                        }
                        Err(err) => warn!(error = %err, "No positions for this directory"),
                    }
                    directory = Some(received);
                    latest = None;
                }
                Ok(NetworkEvent::Status(ConnectionStatus::Failed(reason))) => {
                    error!(reason = %reason, "Feed connection failed");
                    break;
                }
                Ok(NetworkEvent::Status(ConnectionStatus::Disconnected)) => {
                    info!("Feed disconnected");
                    break;
                }
                Ok(NetworkEvent::Status(status)) => info!(status = ?status, "Feed status"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            result = client.results.recv() => match result {
                Some(ComputeEvent::Calculated(result)) => latest = Some(result),
                Some(ComputeEvent::Passthrough { .. }) => {}
                None => break,
            },
            _ = report.tick() => {
                if let (Some(directory), Some(result)) = (&directory, &latest) {
                    log_report(result, directory, config.report_rows)?;
                }
                let metrics = client.network.metrics().await?;
                info!(
                    size = metrics.buffer.size,
                    peak = metrics.buffer.peak_size,
                    received = metrics.buffer.total_received,
                    dropped = metrics.buffer.total_dropped,
                    drop_rate = metrics.buffer.drop_rate,
                    decode_failures = metrics.decode_failures,
                    "Ingress"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                client.network.disconnect().await?;
                break;
            }
        }
    }

    Ok(())
}
