//! Relay connections.
//!
//! [`RelayConnector`] opens one [`RelayConnection`] per publication. The
//! production implementation is [`WebSocketRelay`]; tests use the mock
//! connector from `test_utils`.

mod message;
mod websocket;

pub use message::{ClientMessage, RelayMessage};
pub use websocket::{WebSocketConnection, WebSocketRelay};

use async_trait::async_trait;

use crate::event::Event;
use crate::Result;

/// Opens connections to relays.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Connect to the relay at `relay` (a `ws://` or `wss://` URI).
    ///
    /// Fails with [`ZapError::Connect`](crate::ZapError::Connect) when the
    /// relay cannot be reached and
    /// [`ZapError::Timeout`](crate::ZapError::Timeout) when connecting takes
    /// too long.
    async fn connect(&self, relay: &str) -> Result<Box<dyn RelayConnection>>;
}

/// An open connection to one relay.
#[async_trait]
pub trait RelayConnection: Send {
    /// URI this connection was opened for.
    fn relay(&self) -> &str;

    /// Publish `event` and wait until the relay accepts it.
    async fn publish(&mut self, event: &Event) -> Result<()>;

    /// Release the connection.
    async fn close(&mut self) -> Result<()>;
}
