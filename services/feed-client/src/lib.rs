//! Feed Client
//!
//! Consumes the price feed and turns it into a ranked P&L view. Work is
//! split across isolated tasks that share nothing and talk only through
//! channels:
//!
//! ```text
//!   consumers ◀──events── network/decode ──ComputeCommand──▶ compute
//!       │                   (socket, gate,                   (PnlEngine)
//!       └──NetworkCommand──▶ buffer, decoder)                     │
//!                                                                 ▼
//!                                                         ComputeEvent ──▶ presentation
//! ```

pub mod buffer;
pub mod compute;
pub mod config;
pub mod control;
pub mod drain;
pub mod gate;
pub mod network;
pub mod report;

use pnl_core::PnlEngine;
use tokio::sync::mpsc;

use crate::compute::spawn_compute;
use crate::config::NetworkConfig;
use crate::control::{ComputeCommand, ComputeEvent};
use crate::network::{spawn_network, NetworkHandle};

pub const SERVICE_VERSION: &str = "0.1.0";

/// A running client: network and compute tasks wired together.
pub struct FeedClient {
    pub network: NetworkHandle,
    /// For supplying positions to the compute domain.
    pub compute: mpsc::UnboundedSender<ComputeCommand>,
    pub results: mpsc::UnboundedReceiver<ComputeEvent>,
}

impl FeedClient {
    /// Spawn both tasks. Needs a Tokio runtime.
    pub fn start(config: NetworkConfig) -> Self {
        let compute = spawn_compute(PnlEngine::new());
        let network = spawn_network(config, compute.commands.clone());
        Self {
            network,
            compute: compute.commands,
            results: compute.events,
        }
    }
}
