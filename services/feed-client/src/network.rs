//! Network/decode domain
//!
//! One task owns the socket, the readiness gate, the bounded buffer and the
//! decode session. Consumers drive it through [`NetworkHandle`].
//!
//! ```text
//!   socket ──▶ gate ──(ready)──▶ first frame? ──▶ Directory ──▶ compute
//!                                    │
//!                                    └──▶ buffer ──(drain slice)──▶ decode ──▶ compute
//! ```
//!
//! The gate opens once the compute domain acknowledges its reset for the
//! new connection, so no frame of a new session reaches stale state.
//! Disconnecting clears both tiers and resets the decoder.

use bytes::Bytes;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use types::errors::PipelineError;
use wire::{DecodeSession, SessionState, WireMessage};

use crate::buffer::{
    AddOutcome, BufferConfig, BufferConfigError, BufferMetrics, DropPolicy, IngressBuffer,
};
use crate::config::NetworkConfig;
use crate::control::{
    ComputeCommand, ConnectionStatus, NetworkCommand, NetworkEvent, NetworkMetrics,
};
use crate::drain::{drain_slice, DrainConfig};
use crate::gate::ReadinessGate;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network task has stopped")]
    Stopped,

    #[error(transparent)]
    Config(#[from] BufferConfigError),
}

/// Cloneable control surface of the network task.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    commands: mpsc::Sender<NetworkCommand>,
    events: broadcast::Sender<NetworkEvent>,
}

impl NetworkHandle {
    pub async fn connect(&self, url: impl Into<String>) -> Result<(), NetworkError> {
        self.send(NetworkCommand::Connect { url: url.into() }).await
    }

    pub async fn disconnect(&self) -> Result<(), NetworkError> {
        self.send(NetworkCommand::Disconnect).await
    }

    pub async fn metrics(&self) -> Result<NetworkMetrics, NetworkError> {
        let (reply, response) = oneshot::channel();
        self.send(NetworkCommand::GetMetrics { reply }).await?;
        response.await.map_err(|_| NetworkError::Stopped)
    }

    /// Reconfigure the bounded buffer, keeping its contents.
    pub async fn update_config(
        &self,
        policy: DropPolicy,
        capacity: usize,
        keep_at_edges: usize,
    ) -> Result<BufferMetrics, NetworkError> {
        let (reply, response) = oneshot::channel();
        self.send(NetworkCommand::UpdateConfig {
            policy,
            capacity,
            keep_at_edges,
            reply,
        })
        .await?;
        Ok(response.await.map_err(|_| NetworkError::Stopped)??)
    }

    /// Status and directory events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: NetworkCommand) -> Result<(), NetworkError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| NetworkError::Stopped)
    }
}

/// Start the network task. It stops once every handle is dropped.
pub fn spawn_network(
    config: NetworkConfig,
    compute: mpsc::UnboundedSender<ComputeCommand>,
) -> NetworkHandle {
    let (commands, receiver) = mpsc::channel(32);
    let (events, _) = broadcast::channel(config.event_capacity.max(1));

    let worker = NetworkWorker {
        commands: receiver,
        events: events.clone(),
        compute,
        socket: None,
        readiness: None,
        gate: ReadinessGate::new(),
        buffer: IngressBuffer::new(config.buffer),
        session: DecodeSession::new(),
        drain: config.drain,
        status: ConnectionStatus::Disconnected,
    };
    tokio::spawn(worker.run());

    NetworkHandle { commands, events }
}

struct NetworkWorker {
    commands: mpsc::Receiver<NetworkCommand>,
    events: broadcast::Sender<NetworkEvent>,
    compute: mpsc::UnboundedSender<ComputeCommand>,
    socket: Option<Socket>,
    readiness: Option<oneshot::Receiver<()>>,
    gate: ReadinessGate<Bytes>,
    buffer: IngressBuffer<Bytes>,
    session: DecodeSession,
    drain: DrainConfig,
    status: ConnectionStatus,
}

impl NetworkWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                ready = wait_ready(&mut self.readiness) => self.on_ready(ready).await,
                frame = next_frame(&mut self.socket) => self.on_frame(frame).await,
                _ = tokio::task::yield_now(), if !self.buffer.is_empty() => self.drain_slice(),
            }
        }

        self.teardown(ConnectionStatus::Disconnected).await;
        debug!("Network task stopped");
    }

    async fn handle_command(&mut self, command: NetworkCommand) {
        match command {
            NetworkCommand::Connect { url } => self.connect(url).await,
            NetworkCommand::Disconnect => self.teardown(ConnectionStatus::Disconnected).await,
            NetworkCommand::GetMetrics { reply } => {
                let _ = reply.send(self.metrics());
            }
            NetworkCommand::UpdateConfig {
                policy,
                capacity,
                keep_at_edges,
                reply,
            } => {
                let config = BufferConfig {
                    capacity,
                    policy,
                    keep_at_edges,
                    ..self.buffer.config().clone()
                };
                let result = config.validate().map(|()| self.buffer.reconfigure(config));
                if let Ok(metrics) = &result {
                    info!(
                        policy = %policy,
                        capacity,
                        keep_at_edges,
                        size = metrics.size,
                        "Ingress buffer reconfigured"
                    );
                }
                let _ = reply.send(result);
            }
        }
    }

    async fn connect(&mut self, url: String) {
        if self.socket.is_some() {
            self.teardown(ConnectionStatus::Disconnected).await;
        }
        self.set_status(ConnectionStatus::Connecting);

        let socket = match connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(err) => {
                let err = PipelineError::Connection(err.to_string());
                warn!(url = %url, error = %err, "Connection failed");
                self.set_status(ConnectionStatus::Failed(err.to_string()));
                return;
            }
        };

        let (ack, ready) = oneshot::channel();
        if self.compute.send(ComputeCommand::Reset { ack }).is_err() {
            self.set_status(ConnectionStatus::Failed("compute domain stopped".to_string()));
            return;
        }

        self.socket = Some(socket);
        self.readiness = Some(ready);
        info!(url = %url, "Connected to feed");
        self.set_status(ConnectionStatus::Connected);
    }

    async fn on_ready(&mut self, acknowledged: bool) {
        self.readiness = None;
        if !acknowledged {
            warn!("Compute domain dropped the reset, closing connection");
            self.teardown(ConnectionStatus::Failed("compute domain stopped".to_string()))
                .await;
            return;
        }

        let held = self.gate.open();
        debug!(held = held.len(), "Decoder ready, releasing held frames");
        for frame in held {
            self.ingest(frame);
        }
    }

    async fn on_frame(&mut self, frame: Option<Result<Message, WsError>>) {
        match frame {
            Some(Ok(Message::Binary(payload))) => match self.gate.admit(Bytes::from(payload)) {
                Some(frame) => self.ingest(frame),
                None => debug!(
                    pending = self.gate.pending(),
                    reason = %PipelineError::SchemaNotReady,
                    "Frame held at gate"
                ),
            },
            Some(Ok(Message::Ping(payload))) => {
                if let Some(socket) = self.socket.as_mut() {
                    if let Err(err) = socket.send(Message::Pong(payload)).await {
                        warn!(error = %err, "Failed to answer ping");
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("Feed closed the connection");
                self.teardown(ConnectionStatus::Disconnected).await;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                let err = PipelineError::Connection(err.to_string());
                warn!(error = %err, "Connection lost");
                self.teardown(ConnectionStatus::Failed(err.to_string())).await;
            }
        }
    }

    /// Route a frame that has passed the gate. The directory is decoded on
    /// arrival so no drop policy can ever discard it.
    fn ingest(&mut self, frame: Bytes) {
        if self.session.state() == SessionState::AwaitingDirectory {
            if let Ok(WireMessage::Directory(directory)) = self.session.decode(&frame) {
                info!(symbols = directory.len(), "Directory received");
                let _ = self.compute.send(ComputeCommand::SetHeader(directory.clone()));
                let _ = self.events.send(NetworkEvent::Directory(directory));
            }
            return;
        }

        let dropped = match self.buffer.add(frame) {
            AddOutcome::Stored => return,
            AddOutcome::Evicted(n) => n,
            AddOutcome::Rejected => 1,
        };
        let err = PipelineError::CapacityExceeded {
            capacity: self.buffer.config().capacity,
            dropped,
        };
        debug!(policy = %self.buffer.config().policy, error = %err, "Ingress buffer overflow");
    }

    fn drain_slice(&mut self) {
        let session = &mut self.session;
        let compute = &self.compute;
        let report = drain_slice(&mut self.buffer, self.drain.slice_budget, |frame| {
            if let Ok(WireMessage::Update(batch)) = session.decode(&frame) {
                let _ = compute.send(ComputeCommand::Calculate {
                    batch,
                    timestamp: Utc::now(),
                });
            }
        });
        if report.yielded_early() {
            debug!(
                processed = report.processed,
                remaining = report.remaining,
                "Drain slice out of budget"
            );
        }
    }

    fn metrics(&self) -> NetworkMetrics {
        NetworkMetrics {
            buffer: self.buffer.metrics(),
            gate_pending: self.gate.pending(),
            frames_decoded: self.session.frames_decoded(),
            decode_failures: self.session.frames_dropped(),
            status: self.status.clone(),
        }
    }

    /// Close the socket and clear every per-connection structure.
    async fn teardown(&mut self, status: ConnectionStatus) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
        self.readiness = None;
        self.gate.close();
        self.buffer.clear();
        self.session.reset();

        if self.status != status {
            self.set_status(status);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        info!(status = ?status, "Connection status changed");
        self.status = status.clone();
        // No subscribers is fine
        let _ = self.events.send(NetworkEvent::Status(status));
    }
}

async fn wait_ready(readiness: &mut Option<oneshot::Receiver<()>>) -> bool {
    match readiness {
        Some(ready) => ready.await.is_ok(),
        None => std::future::pending().await,
    }
}

async fn next_frame(socket: &mut Option<Socket>) -> Option<Result<Message, WsError>> {
    match socket {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}
