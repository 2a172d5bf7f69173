//! Connected-client registry
//!
//! Each client is a pair of outbound queues plus a liveness flag: a bounded
//! frame queue that may overflow, and a single ping slot that never competes
//! with frames. The registry never touches sockets: closing a client means
//! dropping its senders, which ends that connection's writer task.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

/// Unique client identifier.
pub type ClientId = u64;

/// What the writer task of one connection should put on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Bytes),
    Ping,
}

/// Result of offering one message to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// All outbound slots busy; the client misses this message.
    Full,
    /// The connection is gone.
    Closed,
}

/// Registry side of a connection's queues.
#[derive(Debug, Clone)]
pub struct ClientOutbound {
    frames: mpsc::Sender<Bytes>,
    pings: mpsc::Sender<()>,
}

/// Writer side of a connection's queues. Pings are handed out ahead of
/// queued frames.
#[derive(Debug)]
pub struct ClientInbox {
    frames: mpsc::Receiver<Bytes>,
    pings: mpsc::Receiver<()>,
}

/// Queues for one connection: `slots` frames plus one pending ping.
pub fn outbound_channel(slots: usize) -> (ClientOutbound, ClientInbox) {
    let (frames_tx, frames_rx) = mpsc::channel(slots.max(1));
    let (pings_tx, pings_rx) = mpsc::channel(1);
    (
        ClientOutbound {
            frames: frames_tx,
            pings: pings_tx,
        },
        ClientInbox {
            frames: frames_rx,
            pings: pings_rx,
        },
    )
}

impl ClientOutbound {
    fn offer_frame(&self, frame: Bytes) -> Delivery {
        delivery(self.frames.try_send(frame))
    }

    fn offer_ping(&self) -> Delivery {
        delivery(self.pings.try_send(()))
    }
}

fn delivery<T>(result: Result<(), TrySendError<T>>) -> Delivery {
    match result {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => Delivery::Full,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

impl ClientInbox {
    /// Next message for the socket. `None` once the registry dropped the
    /// client and every queued frame was taken.
    pub async fn recv(&mut self) -> Option<Outbound> {
        tokio::select! {
            biased;
            Some(()) = self.pings.recv() => Some(Outbound::Ping),
            frame = self.frames.recv() => frame.map(Outbound::Frame),
        }
    }

    pub fn try_recv(&mut self) -> Result<Outbound, TryRecvError> {
        if self.pings.try_recv().is_ok() {
            return Ok(Outbound::Ping);
        }
        self.frames.try_recv().map(Outbound::Frame)
    }
}

#[derive(Debug)]
struct Client {
    outbound: ClientOutbound,
    alive: bool,
}

/// Outcome of one heartbeat sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sweep {
    /// Clients that never answered the previous ping.
    pub terminated: Vec<ClientId>,
    /// Clients whose connection was already gone.
    pub closed: Vec<ClientId>,
    pub pinged: usize,
}

/// Uses BTreeMap so broadcast order follows join order.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientId, Client>,
    next_id: ClientId,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a new client and return its ID. New clients count as alive.
    pub fn register(&mut self, outbound: ClientOutbound) -> ClientId {
        let id = self.next_id;
        self.next_id += 1;
        self.clients.insert(
            id,
            Client {
                outbound,
                alive: true,
            },
        );
        id
    }

    /// Remove a client. Returns false if it was already gone.
    pub fn disconnect(&mut self, client_id: ClientId) -> bool {
        self.clients.remove(&client_id).is_some()
    }

    pub fn record_pong(&mut self, client_id: ClientId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.alive = true;
        }
    }

    /// Offer a frame to every client, in ID order.
    pub fn broadcast(&self, frame: &Bytes) -> Vec<(ClientId, Delivery)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.outbound.offer_frame(frame.clone())))
            .collect()
    }

    /// Heartbeat cycle: drop clients that stayed silent since the last
    /// cycle, then mark the rest pending and ping them.
    pub fn sweep(&mut self) -> Sweep {
        let mut sweep = Sweep::default();

        let silent: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, client)| !client.alive)
            .map(|(id, _)| *id)
            .collect();
        for id in silent {
            self.clients.remove(&id);
            sweep.terminated.push(id);
        }

        for (id, client) in self.clients.iter_mut() {
            client.alive = false;
            match client.outbound.offer_ping() {
                Delivery::Closed => sweep.closed.push(*id),
                // Full means an earlier ping is still queued
                Delivery::Sent | Delivery::Full => sweep.pinged += 1,
            }
        }
        for id in &sweep.closed {
            self.clients.remove(id);
        }

        sweep
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
