//! Integration tests for the WebSocket relay client against a local relay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use zapkit_lib::test_utils::sender_signer;
use zapkit_lib::{
    Event, Kind, Publisher, RelayConnection, RelayConnector, Sha256Hasher, Tags, UnsignedEvent,
    WebSocketRelay, ZapError,
};

#[derive(Clone, Copy)]
enum Mode {
    /// Acknowledge every event.
    Accept,
    /// `OK false` for zap receipts.
    RejectReceipts,
    /// Send a NOTICE and an OK for another id before the real OK.
    Noisy,
    /// Never answer.
    Silent,
}

#[derive(Default)]
struct Seen {
    events: Vec<Value>,
    close_frames: usize,
}

/// Start a relay on an ephemeral port; returns its URI.
async fn start_relay(mode: Mode) -> (String, Arc<Mutex<Seen>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let log = seen.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(frame)) = ws.next().await {
                    match frame {
                        Message::Text(text) => {
                            let msg: Value = serde_json::from_str(text.as_str()).unwrap();
                            assert_eq!(msg[0], "EVENT");
                            let event = msg[1].clone();
                            let id = event["id"].clone();
                            let kind = event["kind"].as_u64().unwrap();
                            log.lock().unwrap().events.push(event);

                            let replies = match mode {
                                Mode::Accept => vec![json!(["OK", id, true, ""])],
                                Mode::RejectReceipts if kind == 9735 => {
                                    vec![json!(["OK", id, false, "blocked: no receipts"])]
                                }
                                Mode::RejectReceipts => vec![json!(["OK", id, true, ""])],
                                Mode::Noisy => vec![
                                    json!(["NOTICE", "hello"]),
                                    json!(["OK", "ff".repeat(32), false, "not yours"]),
                                    json!(["EOSE", "sub"]),
                                    json!(["OK", id, true, "duplicate: already have it"]),
                                ],
                                Mode::Silent => vec![],
                            };
                            for reply in replies {
                                ws.send(Message::text(reply.to_string())).await.unwrap();
                            }
                        }
                        Message::Close(_) => {
                            log.lock().unwrap().close_frames += 1;
                            break;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    (format!("ws://{}", addr), seen)
}

/// Start a relay that completes the handshake and then never reads.
async fn start_stalled_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(ws);
            });
        }
    });

    format!("ws://{}", addr)
}

fn event(kind: Kind, content: &str) -> Event {
    UnsignedEvent::new(kind, Tags::new(), content)
        .sign(&sender_signer(), &Sha256Hasher)
        .unwrap()
}

#[tokio::test]
async fn test_publish_in_order() {
    let (uri, seen) = start_relay(Mode::Accept).await;
    let publisher = Publisher::new(Arc::new(WebSocketRelay::new(Duration::from_secs(5))));
    let request = event(Kind::ZAP_REQUEST, "request");
    let receipt = event(Kind::ZAP_RECEIPT, "");

    publisher
        .publish(&uri, &[request.clone(), receipt.clone()])
        .await
        .unwrap();

    // give the server a moment to record the close frame
    tokio::time::sleep(Duration::from_millis(100)).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.events.len(), 2);
    assert_eq!(seen.events[0]["id"], request.id);
    assert_eq!(seen.events[1]["id"], receipt.id);
    let echoed: Event = serde_json::from_value(seen.events[1].clone()).unwrap();
    assert_eq!(echoed, receipt);
    assert_eq!(seen.close_frames, 1);
}

#[tokio::test]
async fn test_rejection_surfaces_reason() {
    let (uri, seen) = start_relay(Mode::RejectReceipts).await;
    let publisher = Publisher::new(Arc::new(WebSocketRelay::new(Duration::from_secs(5))));
    let receipt = event(Kind::ZAP_RECEIPT, "");

    let err = publisher
        .publish(&uri, &[event(Kind::ZAP_REQUEST, "r"), receipt.clone()])
        .await
        .unwrap_err();

    match err {
        ZapError::PublishRejected {
            relay,
            event_id,
            reason,
        } => {
            assert_eq!(relay, uri);
            assert_eq!(event_id, receipt.id);
            assert_eq!(reason, "blocked: no receipts");
        }
        other => panic!("unexpected error: {other}"),
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().close_frames, 1);
}

#[tokio::test]
async fn test_unrelated_frames_are_ignored() {
    let (uri, _) = start_relay(Mode::Noisy).await;
    let relay = WebSocketRelay::new(Duration::from_secs(5));

    let mut conn = relay.connect(&uri).await.unwrap();
    assert_eq!(conn.relay(), uri);
    conn.publish(&event(Kind::ZAP_REQUEST, "noisy")).await.unwrap();
    conn.close().await.unwrap();
    // closing twice is harmless
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_ack_times_out() {
    let (uri, seen) = start_relay(Mode::Silent).await;
    let publisher = Publisher::new(Arc::new(WebSocketRelay::new(Duration::from_millis(300))));

    let err = publisher
        .publish(&uri, &[event(Kind::ZAP_REQUEST, "silent")])
        .await
        .unwrap_err();
    assert!(matches!(err, ZapError::Timeout { timeout_ms: 300, .. }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().events.len(), 1);
    assert_eq!(seen.lock().unwrap().close_frames, 1);
}

#[tokio::test]
async fn test_stalled_send_times_out() {
    let uri = start_stalled_relay().await;
    let publisher = Publisher::new(Arc::new(WebSocketRelay::new(Duration::from_millis(300))));
    // larger than the loopback socket buffers, so the write cannot complete
    let huge = event(Kind::ZAP_REQUEST, &"x".repeat(32 * 1024 * 1024));

    let started = std::time::Instant::now();
    let err = publisher.publish(&uri, &[huge]).await.unwrap_err();

    match err {
        ZapError::Timeout {
            operation,
            timeout_ms,
        } => {
            assert!(operation.starts_with("send to"), "{operation}");
            assert_eq!(timeout_ms, 300);
        }
        other => panic!("unexpected error: {other}"),
    }
    // send and close are each bounded
    assert!(started.elapsed() < Duration::from_secs(5));
}
