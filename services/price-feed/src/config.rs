//! Server configuration
//!
//! Plain structs with defaults. The binary fills them from command-line
//! flags; library code never reads the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tick frequency must be positive and finite, got {0}")]
    InvalidTickRate(f64),

    #[error("heartbeat period must be non-zero")]
    ZeroHeartbeat,

    #[error("outbound slot count must be at least 1")]
    ZeroOutboundSlots,
}

/// Which price generator drives the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OscillatorKind {
    #[default]
    Sine,
    RandomWalk,
}

/// Liveness settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// Ping cycle. A client silent for a full cycle is terminated.
    pub period: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Ticks per second.
    pub tick_hz: f64,
    pub heartbeat: HeartbeatConfig,
    pub oscillator: OscillatorKind,
    pub seed: u64,
    /// Frames a client may have in flight before it starts missing ticks.
    pub outbound_slots: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            tick_hz: 100.0,
            heartbeat: HeartbeatConfig::default(),
            oscillator: OscillatorKind::Sine,
            seed: 0,
            outbound_slots: 4,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 {
            return Err(ConfigError::InvalidTickRate(self.tick_hz));
        }
        if self.heartbeat.period.is_zero() {
            return Err(ConfigError::ZeroHeartbeat);
        }
        if self.outbound_slots == 0 {
            return Err(ConfigError::ZeroOutboundSlots);
        }
        Ok(())
    }

    /// Tick period, never shorter than one microsecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz).max(Duration::from_micros(1))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.heartbeat.period, Duration::from_secs(30));
        assert_eq!(config.oscillator, OscillatorKind::Sine);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let bad_rate = FeedConfig {
            tick_hz: 0.0,
            ..FeedConfig::default()
        };
        assert_eq!(bad_rate.validate(), Err(ConfigError::InvalidTickRate(0.0)));

        let bad_heartbeat = FeedConfig {
            heartbeat: HeartbeatConfig {
                period: Duration::ZERO,
            },
            ..FeedConfig::default()
        };
        assert_eq!(bad_heartbeat.validate(), Err(ConfigError::ZeroHeartbeat));

        let bad_slots = FeedConfig {
            outbound_slots: 0,
            ..FeedConfig::default()
        };
        assert_eq!(bad_slots.validate(), Err(ConfigError::ZeroOutboundSlots));
    }

    #[test]
    fn test_oscillator_kind_serde() {
        let kind: OscillatorKind = serde_json::from_str("\"random-walk\"").unwrap();
        assert_eq!(kind, OscillatorKind::RandomWalk);
    }
}
