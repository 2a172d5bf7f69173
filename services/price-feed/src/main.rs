use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use price_feed::config::{FeedConfig, HeartbeatConfig, OscillatorKind};
use price_feed::server::{serve, AppState};
use tokio::net::TcpListener;
use types::reference::ReferenceTable;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Oscillator {
    Sine,
    RandomWalk,
}

impl From<Oscillator> for OscillatorKind {
    fn from(value: Oscillator) -> Self {
        match value {
            Oscillator::Sine => OscillatorKind::Sine,
            Oscillator::RandomWalk => OscillatorKind::RandomWalk,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "price-feed")]
#[command(about = "Synthetic price feed over WebSocket", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "PRICE_FEED_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// TCP port
    #[arg(long, env = "PRICE_FEED_PORT", default_value_t = 8080)]
    port: u16,

    /// Ticks per second
    #[arg(long, env = "PRICE_FEED_TICK_HZ", default_value_t = 100.0)]
    tick_hz: f64,

    /// Heartbeat period in seconds
    #[arg(long, env = "PRICE_FEED_HEARTBEAT_SECS", default_value_t = 30)]
    heartbeat_secs: u64,

    /// Price generator
    #[arg(long, env = "PRICE_FEED_OSCILLATOR", value_enum, default_value = "sine")]
    oscillator: Oscillator,

    /// Seed for oscillator parameters
    #[arg(long, env = "PRICE_FEED_SEED", default_value_t = 0)]
    seed: u64,

    /// JSON reference table; the built-in table is used when absent
    #[arg(long, env = "PRICE_FEED_REFERENCE")]
    reference: Option<PathBuf>,

    /// Frames a client may have in flight before it misses ticks
    #[arg(long, env = "PRICE_FEED_OUTBOUND_SLOTS", default_value_t = 4)]
    outbound_slots: usize,
}

impl Args {
    fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            bind: self.bind,
            port: self.port,
            tick_hz: self.tick_hz,
            heartbeat: HeartbeatConfig {
                period: Duration::from_secs(self.heartbeat_secs),
            },
            oscillator: self.oscillator.into(),
            seed: self.seed,
            outbound_slots: self.outbound_slots,
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = args.feed_config();
    config.validate().context("invalid configuration")?;
    let reference = args.reference_table()?;

    tracing::info!(
        symbols = reference.len(),
        tick_hz = config.tick_hz,
        oscillator = ?config.oscillator,
        seed = config.seed,
        "Starting price feed"
    );

    let state = AppState::start(&config, &reference);
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!("Listening on {}", addr);
    serve(listener, state).await?;

    Ok(())
}
