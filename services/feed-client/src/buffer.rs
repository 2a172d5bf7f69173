//! Bounded ingress buffer
//!
//! Absorbs bursts between socket arrival and decode. When full, the
//! configured [`DropPolicy`] decides what goes:
//!
//! - `DropOldest`: evict the head, append the new item.
//! - `DropNewest`: discard the incoming item.
//! - `DropMiddle`: keep the first and last `keep_at_edges` items, discard
//!   everything between, append the new item. Falls back to `DropOldest`
//!   when `2 · keep_at_edges >= capacity`.
//!
//! Arrival order of whatever survives is always preserved.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropPolicy {
    #[default]
    DropOldest,
    DropNewest,
    DropMiddle,
}

impl DropPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropPolicy::DropOldest => "drop-oldest",
            DropPolicy::DropNewest => "drop-newest",
            DropPolicy::DropMiddle => "drop-middle",
        }
    }
}

impl fmt::Display for DropPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DropPolicy {
    type Err = BufferConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop-oldest" => Ok(DropPolicy::DropOldest),
            "drop-newest" => Ok(DropPolicy::DropNewest),
            "drop-middle" => Ok(DropPolicy::DropMiddle),
            other => Err(BufferConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferConfigError {
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,

    #[error("unknown drop policy: {0}")]
    UnknownPolicy(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    pub capacity: usize,
    pub policy: DropPolicy,
    /// Items kept at each end under `DropMiddle`.
    pub keep_at_edges: usize,
    /// Fill ratio that triggers the high-water warning.
    pub warn_ratio: f64,
    /// Minimum spacing between two high-water warnings.
    pub warn_interval: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            policy: DropPolicy::DropOldest,
            keep_at_edges: 10,
            warn_ratio: 0.8,
            warn_interval: Duration::from_secs(5),
        }
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<(), BufferConfigError> {
        if self.capacity == 0 {
            return Err(BufferConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Whether `DropMiddle` has room for a middle at this capacity.
    fn middle_fits(&self) -> bool {
        self.keep_at_edges * 2 < self.capacity
    }
}

/// What `add` did with the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Stored,
    /// Stored after evicting this many buffered items.
    Evicted(usize),
    /// The incoming item was discarded.
    Rejected,
}

/// Snapshot of buffer state, queryable at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferMetrics {
    pub size: usize,
    pub peak_size: usize,
    pub total_received: u64,
    pub total_dropped: u64,
    /// Dropped over received, 0 before anything arrived.
    pub drop_rate: f64,
    pub capacity: usize,
    pub policy: DropPolicy,
    pub keep_at_edges: usize,
}

#[derive(Debug)]
pub struct IngressBuffer<T> {
    items: VecDeque<T>,
    config: BufferConfig,
    peak_size: usize,
    total_received: u64,
    total_dropped: u64,
    last_warning: Option<Instant>,
    warnings: u64,
}

impl<T> IngressBuffer<T> {
    /// Create a buffer. A zero capacity is raised to 1.
    pub fn new(mut config: BufferConfig) -> Self {
        config.capacity = config.capacity.max(1);
        Self {
            items: VecDeque::with_capacity(config.capacity),
            config,
            peak_size: 0,
            total_received: 0,
            total_dropped: 0,
            last_warning: None,
            warnings: 0,
        }
    }

    pub fn add(&mut self, item: T) -> AddOutcome {
        self.add_at(item, Instant::now())
    }

    /// `add` with an explicit clock reading for the warning rate limit.
    pub fn add_at(&mut self, item: T, now: Instant) -> AddOutcome {
        self.total_received += 1;
        let outcome = self.store(item);
        self.check_high_water(now);
        outcome
    }

    fn store(&mut self, item: T) -> AddOutcome {
        let capacity = self.config.capacity;
        if self.items.len() < capacity {
            self.items.push_back(item);
            self.peak_size = self.peak_size.max(self.items.len());
            return AddOutcome::Stored;
        }

        let policy = match self.config.policy {
            DropPolicy::DropMiddle if !self.config.middle_fits() => DropPolicy::DropOldest,
            policy => policy,
        };

        match policy {
            DropPolicy::DropOldest => {
                self.items.pop_front();
                self.items.push_back(item);
                self.total_dropped += 1;
                AddOutcome::Evicted(1)
            }
            DropPolicy::DropNewest => {
                self.total_dropped += 1;
                AddOutcome::Rejected
            }
            DropPolicy::DropMiddle => {
                let keep = self.config.keep_at_edges;
                let end = self.items.len() - keep;
                let evicted = self.items.drain(keep..end).count();
                self.items.push_back(item);
                self.total_dropped += evicted as u64;
                AddOutcome::Evicted(evicted)
            }
        }
    }

    fn check_high_water(&mut self, now: Instant) {
        let usage = self.items.len() as f64 / self.config.capacity as f64;
        if usage < self.config.warn_ratio {
            return;
        }
        let due = match self.last_warning {
            Some(at) => now.saturating_duration_since(at) >= self.config.warn_interval,
            None => true,
        };
        if due {
            self.last_warning = Some(now);
            self.warnings += 1;
            warn!(
                size = self.items.len(),
                capacity = self.config.capacity,
                dropped = self.total_dropped,
                policy = %self.config.policy,
                "Ingress buffer above high-water mark"
            );
        }
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Discard buffered items. Counters survive.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply a new configuration, replaying current contents in order. Items
    /// that no longer fit are dropped by the new policy; replayed items are
    /// not counted as received again.
    pub fn reconfigure(&mut self, mut config: BufferConfig) -> BufferMetrics {
        config.capacity = config.capacity.max(1);
        let existing = std::mem::take(&mut self.items);
        self.config = config;
        self.items = VecDeque::with_capacity(self.config.capacity);
        for item in existing {
            self.store(item);
        }
        self.metrics()
    }

    pub fn metrics(&self) -> BufferMetrics {
        let drop_rate = if self.total_received > 0 {
            self.total_dropped as f64 / self.total_received as f64
        } else {
            0.0
        };
        BufferMetrics {
            size: self.items.len(),
            peak_size: self.peak_size,
            total_received: self.total_received,
            total_dropped: self.total_dropped,
            drop_rate,
            capacity: self.config.capacity,
            policy: self.config.policy,
            keep_at_edges: self.config.keep_at_edges,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// High-water warnings emitted so far.
    pub fn warnings(&self) -> u64 {
        self.warnings
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
