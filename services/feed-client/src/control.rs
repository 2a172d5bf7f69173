//! Typed control channels between the client domains
//!
//! Consumer ↔ network: [`NetworkCommand`] in, [`NetworkEvent`] out.
//! Network ↔ compute: [`ComputeCommand`] in, [`ComputeEvent`] out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use types::directory::Directory;
use types::position::{PortfolioAggregate, PositionTable};
use types::record::{EnrichedRecord, UpdateRecord};

use crate::buffer::{BufferConfigError, BufferMetrics, DropPolicy};

/// Socket state as seen by local consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Failed(String),
}

/// Network-domain metrics returned by `get-metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub buffer: BufferMetrics,
    /// Frames held by the readiness gate.
    pub gate_pending: usize,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub status: ConnectionStatus,
}

#[derive(Debug)]
pub enum NetworkCommand {
    Connect {
        url: String,
    },
    Disconnect,
    GetMetrics {
        reply: oneshot::Sender<NetworkMetrics>,
    },
    UpdateConfig {
        policy: DropPolicy,
        capacity: usize,
        keep_at_edges: usize,
        reply: oneshot::Sender<Result<BufferMetrics, BufferConfigError>>,
    },
}

/// Broadcast to every local consumer of the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Status(ConnectionStatus),
    Directory(Directory),
}

#[derive(Debug)]
pub enum ComputeCommand {
    SetHeader(Directory),
    SetPositions(PositionTable),
    Calculate {
        batch: Vec<UpdateRecord>,
        timestamp: DateTime<Utc>,
    },
    /// Drop session state, then acknowledge.
    Reset {
        ack: oneshot::Sender<()>,
    },
}

/// Ranked output of one `Calculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub records: Vec<EnrichedRecord>,
    pub timestamp: DateTime<Utc>,
    pub aggregates: PortfolioAggregate,
    /// Aggregate over every held symbol seen this session.
    pub session: PortfolioAggregate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeEvent {
    Calculated(CalculationResult),
    /// No directory yet or an empty batch: input returned untouched.
    Passthrough {
        batch: Vec<UpdateRecord>,
        timestamp: DateTime<Utc>,
    },
}
