//! Recording relay connector.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::event::{Event, Kind};
use crate::relay::{RelayConnection, RelayConnector};
use crate::{Result, ZapError};

/// An event accepted by the mock relay.
#[derive(Clone, Debug)]
pub struct PublishedEvent {
    /// Relay it was published to.
    pub relay: String,
    /// The event.
    pub event: Event,
}

#[derive(Default)]
struct RelayLog {
    connects: Vec<String>,
    published: Vec<PublishedEvent>,
    closes: usize,
}

#[derive(Clone, Default)]
enum Behavior {
    #[default]
    Accept,
    FailConnect,
    Reject(Kind, String),
    NoAck,
}

/// In-memory [`RelayConnector`] that records every interaction.
#[derive(Default)]
pub struct MockRelayConnector {
    log: Arc<RwLock<RelayLog>>,
    behavior: Behavior,
}

impl MockRelayConnector {
    /// A relay that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every connection.
    pub fn fail_connect(mut self) -> Self {
        self.behavior = Behavior::FailConnect;
        self
    }

    /// Answer `OK false` for events of `kind`.
    pub fn reject_kind(mut self, kind: Kind, reason: impl Into<String>) -> Self {
        self.behavior = Behavior::Reject(kind, reason.into());
        self
    }

    /// Never acknowledge; every publish times out.
    pub fn no_ack(mut self) -> Self {
        self.behavior = Behavior::NoAck;
        self
    }

    /// Accepted events in publication order.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.log.read().unwrap().published.clone()
    }

    /// Relays connection attempts were made to, in order.
    pub fn connected_relays(&self) -> Vec<String> {
        self.log.read().unwrap().connects.clone()
    }

    /// Number of connection attempts.
    pub fn connect_count(&self) -> usize {
        self.log.read().unwrap().connects.len()
    }

    /// Number of closed connections.
    pub fn close_count(&self) -> usize {
        self.log.read().unwrap().closes
    }
}

#[async_trait]
impl RelayConnector for MockRelayConnector {
    async fn connect(&self, relay: &str) -> Result<Box<dyn RelayConnection>> {
        self.log.write().unwrap().connects.push(relay.to_string());
        if let Behavior::FailConnect = self.behavior {
            return Err(ZapError::Connect {
                relay: relay.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(MockRelayConnection {
            relay: relay.to_string(),
            log: self.log.clone(),
            behavior: self.behavior.clone(),
        }))
    }
}

struct MockRelayConnection {
    relay: String,
    log: Arc<RwLock<RelayLog>>,
    behavior: Behavior,
}

#[async_trait]
impl RelayConnection for MockRelayConnection {
    fn relay(&self) -> &str {
        &self.relay
    }

    async fn publish(&mut self, event: &Event) -> Result<()> {
        match &self.behavior {
            Behavior::Reject(kind, reason) if *kind == event.kind => {
                return Err(ZapError::PublishRejected {
                    relay: self.relay.clone(),
                    event_id: event.id.clone(),
                    reason: reason.clone(),
                });
            }
            Behavior::NoAck => {
                return Err(ZapError::timeout(
                    format!("acknowledgement from {}", self.relay),
                    0,
                ));
            }
            _ => {}
        }
        self.log.write().unwrap().published.push(PublishedEvent {
            relay: self.relay.clone(),
            event: event.clone(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.write().unwrap().closes += 1;
        Ok(())
    }
}
