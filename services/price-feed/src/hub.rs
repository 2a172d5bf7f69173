//! Shared subscription and fan-out
//!
//! One [`BroadcastHub`] backs every connection. It is owned by a single
//! actor task; connection handlers talk to it through a [`HubHandle`].
//!
//! ```text
//!   join ──▶ first client? ──▶ start ticker + heartbeat
//!   tick ──▶ TickSource::tick ──▶ encode once ──▶ try_send to every client
//!   beat ──▶ terminate silent clients, ping the rest
//!   leave ─▶ last client? ──▶ stop ticker + heartbeat
//! ```
//!
//! Generation, encoding and fan-out run inline in the tick branch, so slow
//! work delays the next tick instead of piling ticks up.

use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use types::directory::Directory;

use crate::config::FeedConfig;
use crate::metrics::FeedMetrics;
use crate::oscillator::TickSource;
use crate::registry::{ClientId, ClientOutbound, ClientRegistry, Delivery};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("broadcast hub has shut down")]
    Closed,
}

/// What one tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub records: usize,
    pub delivered: usize,
    pub missed: usize,
    pub removed: Vec<ClientId>,
}

/// Subscription state: the tick source plus every connected client.
pub struct BroadcastHub {
    source: Box<dyn TickSource>,
    registry: ClientRegistry,
    metrics: Arc<FeedMetrics>,
    active: bool,
}

impl BroadcastHub {
    pub fn new(source: Box<dyn TickSource>, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            source,
            registry: ClientRegistry::new(),
            metrics,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn client_count(&self) -> usize {
        self.registry.client_count()
    }

    /// Add a client. Returns its ID and whether this join activated the
    /// subscription.
    pub fn join(&mut self, outbound: ClientOutbound) -> (ClientId, bool) {
        let client_id = self.registry.register(outbound);
        self.sync_client_count();
        info!(client_id, clients = self.registry.client_count(), "Client joined");

        let activated = !self.active;
        if activated {
            self.active = true;
            self.metrics.record_activation();
            info!(source = ?self.source.kind(), "Subscription activated");
        }
        (client_id, activated)
    }

    /// Remove a client. Returns whether this leave tore the subscription
    /// down.
    pub fn leave(&mut self, client_id: ClientId) -> bool {
        if self.registry.disconnect(client_id) {
            info!(client_id, clients = self.registry.client_count(), "Client left");
            self.sync_client_count();
        }
        self.deactivate_if_idle()
    }

    pub fn record_pong(&mut self, client_id: ClientId) {
        self.registry.record_pong(client_id);
    }

    /// Pull one batch from the source and offer it to every client.
    pub fn on_tick(&mut self) -> TickReport {
        let started = StdInstant::now();
        let records = self.source.tick();
        let mut report = TickReport {
            records: records.len(),
            ..TickReport::default()
        };

        if !records.is_empty() {
            let frame = wire::encode_update(&records);
            for (client_id, delivery) in self.registry.broadcast(&frame) {
                match delivery {
                    Delivery::Sent => {
                        report.delivered += 1;
                        self.metrics.record_frame();
                    }
                    Delivery::Full => {
                        report.missed += 1;
                        self.metrics.record_missed_tick();
                    }
                    Delivery::Closed => {
                        warn!(client_id, "Broadcast write failed, removing client");
                        self.metrics.record_broadcast_failure();
                        report.removed.push(client_id);
                    }
                }
            }
            for client_id in &report.removed {
                self.registry.disconnect(*client_id);
            }
            if !report.removed.is_empty() {
                self.sync_client_count();
            }
        }

        self.metrics
            .record_tick(report.records, started.elapsed().as_nanos() as u64);
        self.deactivate_if_idle();
        report
    }

    /// Heartbeat cycle. Returns every client removed by it.
    pub fn on_heartbeat(&mut self) -> Vec<ClientId> {
        let sweep = self.registry.sweep();
        for client_id in &sweep.terminated {
            warn!(client_id, "Client missed heartbeat, terminating");
            self.metrics.record_heartbeat_termination();
        }
        for client_id in &sweep.closed {
            debug!(client_id, "Client closed before heartbeat");
        }
        debug!(pinged = sweep.pinged, "Heartbeat sent");

        let mut removed = sweep.terminated;
        removed.extend(sweep.closed);
        if !removed.is_empty() {
            self.sync_client_count();
        }
        self.deactivate_if_idle();
        removed
    }

    fn deactivate_if_idle(&mut self) -> bool {
        if self.active && self.registry.is_empty() {
            self.active = false;
            info!("Subscription deactivated");
            return true;
        }
        false
    }

    fn sync_client_count(&self) {
        self.metrics
            .set_connected_clients(self.registry.client_count() as u64);
    }
}

/// Messages from connection handlers to the hub task.
#[derive(Debug)]
pub enum HubCommand {
    Join {
        outbound: ClientOutbound,
        reply: oneshot::Sender<ClientId>,
    },
    Leave(ClientId),
    Pong(ClientId),
}

/// Cloneable access to the running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    directory_frame: Bytes,
    outbound_slots: usize,
}

impl HubHandle {
    /// The encoded directory sent first on every connection.
    pub fn directory_frame(&self) -> Bytes {
        self.directory_frame.clone()
    }

    pub fn outbound_slots(&self) -> usize {
        self.outbound_slots
    }

    pub async fn join(&self, outbound: ClientOutbound) -> Result<ClientId, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(HubCommand::Join { outbound, reply })
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }

    pub async fn leave(&self, client_id: ClientId) {
        let _ = self.commands.send(HubCommand::Leave(client_id)).await;
    }

    pub async fn pong(&self, client_id: ClientId) {
        let _ = self.commands.send(HubCommand::Pong(client_id)).await;
    }
}

/// Start the hub task. It runs until every handle is dropped.
pub fn spawn_hub(hub: BroadcastHub, directory: &Directory, config: &FeedConfig) -> HubHandle {
    let (commands, receiver) = mpsc::channel(256);
    tokio::spawn(run(
        hub,
        receiver,
        config.tick_interval(),
        config.heartbeat.period,
    ));

    HubHandle {
        commands,
        directory_frame: wire::encode_directory(directory),
        outbound_slots: config.outbound_slots,
    }
}

async fn run(
    mut hub: BroadcastHub,
    mut commands: mpsc::Receiver<HubCommand>,
    tick_every: Duration,
    heartbeat_every: Duration,
) {
    let mut ticker: Option<Interval> = None;
    let mut heartbeat: Option<Interval> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    HubCommand::Join { outbound, reply } => {
                        let (client_id, activated) = hub.join(outbound);
                        if activated {
                            let mut tick = interval(tick_every);
                            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            ticker = Some(tick);
                            heartbeat = Some(interval_at(
                                Instant::now() + heartbeat_every,
                                heartbeat_every,
                            ));
                        }
                        let _ = reply.send(client_id);
                    }
                    HubCommand::Leave(client_id) => {
                        hub.leave(client_id);
                    }
                    HubCommand::Pong(client_id) => hub.record_pong(client_id),
                }
            }
            _ = next_tick(&mut ticker) => {
                hub.on_tick();
            }
            _ = next_tick(&mut heartbeat) => {
                hub.on_heartbeat();
            }
        }

        if !hub.is_active() {
            ticker = None;
            heartbeat = None;
        }
    }

    debug!("Hub task stopped");
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
