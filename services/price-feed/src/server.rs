//! HTTP and WebSocket surface
//!
//! `GET /` and `GET /ws` upgrade to the feed socket. `GET /metrics` returns
//! the counters as JSON, `GET /health` answers `ok`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use types::reference::ReferenceTable;

use crate::config::FeedConfig;
use crate::hub::{spawn_hub, BroadcastHub, HubHandle};
use crate::metrics::FeedMetrics;
use crate::oscillator;
use crate::registry::{outbound_channel, Outbound};

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub metrics: Arc<FeedMetrics>,
}

impl AppState {
    /// Build the tick source and start the hub task. Needs a Tokio runtime.
    pub fn start(config: &FeedConfig, reference: &ReferenceTable) -> Self {
        let metrics = Arc::new(FeedMetrics::new());
        let source = oscillator::build(config.oscillator, reference, config.seed, config.tick_hz);
        let hub = BroadcastHub::new(source, Arc::clone(&metrics));
        let handle = spawn_hub(hub, &reference.directory(), config);
        Self {
            hub: handle,
            metrics,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, create_router(state)).await
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.metrics.export())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let (mut sink, mut stream) = socket.split();

    // Directory goes out before the connection joins the subscription
    if let Err(err) = sink
        .send(Message::Binary(hub.directory_frame().to_vec()))
        .await
    {
        warn!(error = %err, "Failed to send directory, dropping connection");
        return;
    }

    let (outbound, mut pending) = outbound_channel(hub.outbound_slots());
    let client_id = match hub.join(outbound).await {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "Connection refused");
            return;
        }
    };

    let mut writer = tokio::spawn(async move {
        while let Some(message) = pending.recv().await {
            let message = match message {
                Outbound::Frame(frame) => Message::Binary(frame.to_vec()),
                Outbound::Ping => Message::Ping(Vec::new()),
            };
            if let Err(err) = sink.send(message).await {
                warn!(client_id, error = %err, "Socket write failed");
                return;
            }
        }
        // Sender dropped by the hub: heartbeat termination or removal
        let _ = sink.send(Message::Close(None)).await;
    });

    let reader_hub = hub.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Pong(_)) => reader_hub.pong(client_id).await,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    debug!(client_id, "Connection closed");
    hub.leave(client_id).await;
}
