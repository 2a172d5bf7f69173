//! Client configuration

use std::time::Duration;

use pnl_core::positions::PositionConfig;

use crate::buffer::BufferConfig;
use crate::drain::DrainConfig;

/// Settings of the network/decode domain.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub buffer: BufferConfig,
    pub drain: DrainConfig,
    /// Backlog of status/directory events per local consumer.
    pub event_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            drain: DrainConfig::default(),
            event_capacity: 64,
        }
    }
}

/// Everything the client binary needs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub network: NetworkConfig,
    pub positions: PositionConfig,
    pub position_seed: u64,
    /// How often the presentation stub reports.
    pub report_interval: Duration,
    /// Rows shown per side in a report.
    pub report_rows: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            network: NetworkConfig::default(),
            positions: PositionConfig::default(),
            position_seed: 0,
            report_interval: Duration::from_secs(1),
            report_rows: 3,
        }
    }
}
