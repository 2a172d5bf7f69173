//! End-to-end over a real socket: Directory first, Updates after.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::{Stream, StreamExt};
use price_feed::config::FeedConfig;
use price_feed::server::{create_router, serve, AppState};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;
use types::reference::ReferenceTable;
use wire::{DecodeSession, WireMessage};

async fn start_server() -> (String, AppState) {
    let config = FeedConfig {
        tick_hz: 50.0,
        ..FeedConfig::default()
    };
    let state = AppState::start(&config, &ReferenceTable::builtin());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state.clone()));
    (format!("ws://{addr}/ws"), state)
}

/// Next binary payload, skipping control frames.
async fn next_binary<S>(stream: &mut S) -> Vec<u8>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        if let Message::Binary(payload) = message {
            return payload;
        }
    }
}

#[tokio::test]
async fn test_directory_is_first_then_updates() {
    let (url, _state) = start_server().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let mut session = DecodeSession::new();

    let first = next_binary(&mut socket).await;
    let directory = match session.decode(&first).unwrap() {
        WireMessage::Directory(directory) => directory,
        other => panic!("expected directory, got {}", other.label()),
    };
    assert_eq!(directory, ReferenceTable::builtin().directory());

    for _ in 0..5 {
        let payload = next_binary(&mut socket).await;
        match session.decode(&payload).unwrap() {
            WireMessage::Update(records) => {
                assert!(!records.is_empty());
                for record in records {
                    assert!(record.validate().is_ok());
                }
            }
            other => panic!("expected update, got {}", other.label()),
        }
    }
}

#[tokio::test]
async fn test_each_connection_gets_its_own_directory() {
    let (url, state) = start_server().await;

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let mut first_session = DecodeSession::new();
    first_session.decode(&next_binary(&mut first).await).unwrap();
    first_session.decode(&next_binary(&mut first).await).unwrap();

    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let mut second_session = DecodeSession::new();
    let opening = second_session.decode(&next_binary(&mut second).await).unwrap();
    assert_eq!(opening.label(), "directory");
    let next = second_session.decode(&next_binary(&mut second).await).unwrap();
    assert_eq!(next.label(), "update");

    let exported = state.metrics.export();
    assert_eq!(exported["subscription_activations"], 1);
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let state = AppState::start(&FeedConfig::default(), &ReferenceTable::builtin());

    let health = create_router(state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = axum::body::to_bytes(health.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");

    let metrics = create_router(state)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let body = axum::body::to_bytes(metrics.into_body(), usize::MAX).await.unwrap();
    let parsed: std::collections::BTreeMap<String, u64> = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["connected_clients"], 0);
}
