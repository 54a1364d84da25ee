//! WebSocket relay client built on `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::message::{ClientMessage, RelayMessage};
use super::{RelayConnection, RelayConnector};
use crate::config::RelayConfig;
use crate::event::Event;
use crate::zap::is_relay_uri;
use crate::{Result, ZapError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`RelayConnector`] over WebSockets.
///
/// The timeout bounds connecting, and separately each send, each wait for
/// `OK` and the close handshake.
#[derive(Clone, Debug)]
pub struct WebSocketRelay {
    timeout: Duration,
}

impl WebSocketRelay {
    /// Create a connector with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create a connector using the relay configuration's timeout.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.timeout())
    }

    /// The connect and acknowledgement timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for WebSocketRelay {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

#[async_trait]
impl RelayConnector for WebSocketRelay {
    #[tracing::instrument(skip(self))]
    async fn connect(&self, relay: &str) -> Result<Box<dyn RelayConnection>> {
        if !is_relay_uri(relay) {
            return Err(ZapError::Connect {
                relay: relay.to_string(),
                reason: "not a ws:// or wss:// URI".to_string(),
            });
        }

        let connecting = tokio_tungstenite::connect_async(relay);
        let (socket, _response) = tokio::time::timeout(self.timeout, connecting)
            .await
            .map_err(|_| ZapError::timeout(format!("connect to {}", relay), millis(self.timeout)))?
            .map_err(|e| ZapError::Connect {
                relay: relay.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("connected");
        Ok(Box::new(WebSocketConnection {
            relay: relay.to_string(),
            socket,
            timeout: self.timeout,
            closed: false,
        }))
    }
}

/// An open WebSocket to a relay.
pub struct WebSocketConnection {
    relay: String,
    socket: Socket,
    timeout: Duration,
    closed: bool,
}

impl WebSocketConnection {
    async fn wait_for_ok(&mut self, event_id: &str) -> Result<()> {
        while let Some(frame) = self.socket.next().await {
            let frame = frame.map_err(|e| {
                ZapError::Transport(format!("reading from relay {} failed: {}", self.relay, e))
            })?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            match RelayMessage::parse(text.as_str()) {
                Ok(RelayMessage::Ok {
                    event_id: acked,
                    accepted,
                    message,
                }) if acked == event_id => {
                    if accepted {
                        return Ok(());
                    }
                    return Err(ZapError::PublishRejected {
                        relay: self.relay.clone(),
                        event_id: event_id.to_string(),
                        reason: message,
                    });
                }
                Ok(RelayMessage::Notice(notice)) => {
                    tracing::debug!(relay = %self.relay, %notice, "relay notice");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(relay = %self.relay, error = %e, "ignoring unparsable frame");
                }
            }
        }

        Err(ZapError::PublishRejected {
            relay: self.relay.clone(),
            event_id: event_id.to_string(),
            reason: "connection closed before acknowledgement".to_string(),
        })
    }
}

#[async_trait]
impl RelayConnection for WebSocketConnection {
    fn relay(&self) -> &str {
        &self.relay
    }

    #[tracing::instrument(
        skip(self, event),
        fields(relay = %self.relay, event_id = %event.id, kind = %event.kind)
    )]
    async fn publish(&mut self, event: &Event) -> Result<()> {
        if self.closed {
            return Err(ZapError::Transport(format!(
                "connection to {} is already closed",
                self.relay
            )));
        }

        let frame = ClientMessage::Event(event).to_json()?;
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.socket.send(Message::text(frame))).await {
            Ok(sent) => sent.map_err(|e| {
                ZapError::Transport(format!("sending to relay {} failed: {}", self.relay, e))
            })?,
            Err(_) => {
                return Err(ZapError::timeout(
                    format!("send to {}", self.relay),
                    millis(timeout),
                ))
            }
        }

        match tokio::time::timeout(timeout, self.wait_for_ok(&event.id)).await {
            Ok(result) => result,
            Err(_) => Err(ZapError::timeout(
                format!("acknowledgement from {}", self.relay),
                millis(timeout),
            )),
        }?;

        tracing::info!("event accepted");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.socket.close(None)).await {
            Ok(Ok(()))
            | Ok(Err(tungstenite::Error::ConnectionClosed))
            | Ok(Err(tungstenite::Error::AlreadyClosed)) => Ok(()),
            Ok(Err(e)) => Err(ZapError::Transport(format!(
                "closing connection to {} failed: {}",
                self.relay, e
            ))),
            Err(_) => Err(ZapError::timeout(
                format!("close of {}", self.relay),
                millis(timeout),
            )),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_websocket_uri() {
        let relay = WebSocketRelay::new(Duration::from_secs(1));
        let err = relay.connect("https://relay.example.com").await.err().unwrap();
        assert!(matches!(err, ZapError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let relay = WebSocketRelay::new(Duration::from_secs(2));
        let err = relay
            .connect(&format!("ws://127.0.0.1:{}", port))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ZapError::Connect { .. }));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(WebSocketRelay::default().timeout(), Duration::from_secs(10));
    }
}
