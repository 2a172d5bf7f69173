//! Feed observability
//!
//! Counters for generation, broadcast and liveness, plus a rolling tick
//! latency window. Exported as a flat map on `GET /metrics`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Core metrics for the price feed.
pub struct FeedMetrics {
    // Generation
    pub ticks_generated: AtomicU64,
    pub records_emitted: AtomicU64,
    pub tick_latency_ns: Mutex<LatencyTracker>,

    // Broadcasting
    pub frames_broadcast: AtomicU64,
    pub broadcast_failures: AtomicU64,
    pub missed_ticks: AtomicU64,

    // Connections
    pub connected_clients: AtomicU64,
    pub heartbeat_terminations: AtomicU64,
    pub subscription_activations: AtomicU64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self {
            ticks_generated: AtomicU64::new(0),
            records_emitted: AtomicU64::new(0),
            tick_latency_ns: Mutex::new(LatencyTracker::new(1000)),
            frames_broadcast: AtomicU64::new(0),
            broadcast_failures: AtomicU64::new(0),
            missed_ticks: AtomicU64::new(0),
            connected_clients: AtomicU64::new(0),
            heartbeat_terminations: AtomicU64::new(0),
            subscription_activations: AtomicU64::new(0),
        }
    }

    /// Record one generated tick and the time spent generating and
    /// broadcasting it.
    pub fn record_tick(&self, records: usize, latency_ns: u64) {
        self.ticks_generated.fetch_add(1, Ordering::Relaxed);
        self.records_emitted
            .fetch_add(records as u64, Ordering::Relaxed);
        if let Ok(mut tracker) = self.tick_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Record a frame delivered to one client.
    pub fn record_frame(&self) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write to a client that had gone away.
    pub fn record_broadcast_failure(&self) {
        self.broadcast_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tick skipped for a client whose outbound slots were full.
    pub fn record_missed_tick(&self) {
        self.missed_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat_termination(&self) {
        self.heartbeat_terminations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_activation(&self) {
        self.subscription_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_connected_clients(&self, count: u64) {
        self.connected_clients.store(count, Ordering::Relaxed);
    }

    /// Export metrics as a BTreeMap for JSON exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("ticks_generated".to_string(), self.ticks_generated.load(Ordering::Relaxed));
        m.insert("records_emitted".to_string(), self.records_emitted.load(Ordering::Relaxed));
        m.insert("frames_broadcast".to_string(), self.frames_broadcast.load(Ordering::Relaxed));
        m.insert("broadcast_failures".to_string(), self.broadcast_failures.load(Ordering::Relaxed));
        m.insert("missed_ticks".to_string(), self.missed_ticks.load(Ordering::Relaxed));
        m.insert("connected_clients".to_string(), self.connected_clients.load(Ordering::Relaxed));
        m.insert("heartbeat_terminations".to_string(), self.heartbeat_terminations.load(Ordering::Relaxed));
        m.insert("subscription_activations".to_string(), self.subscription_activations.load(Ordering::Relaxed));
        if let Ok(tracker) = self.tick_latency_ns.lock() {
            if let Some(p50) = tracker.percentile(50) {
                m.insert("tick_latency_p50_ns".to_string(), p50);
            }
            if let Some(p99) = tracker.percentile(99) {
                m.insert("tick_latency_p99_ns".to_string(), p99);
            }
        }
        m
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling window of latency samples for percentile calculation.
pub struct LatencyTracker {
    samples: VecDeque<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (p.min(100) as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
