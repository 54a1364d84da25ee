//! Ordered publication of events to a single relay.

use std::sync::Arc;

use crate::event::Event;
use crate::relay::{RelayConnection, RelayConnector};
use crate::Result;

/// Publishes a batch of events over one relay connection.
#[derive(Clone)]
pub struct Publisher {
    connector: Arc<dyn RelayConnector>,
}

impl Publisher {
    /// Create a publisher using `connector` for every relay.
    pub fn new(connector: Arc<dyn RelayConnector>) -> Self {
        Self { connector }
    }

    /// Publish `events` to `relay` in order.
    ///
    /// Stops at the first failure. The connection is closed whether or not
    /// publishing succeeded; a close failure is only reported when
    /// everything else succeeded.
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    pub async fn publish(&self, relay: &str, events: &[Event]) -> Result<()> {
        let mut connection = self.connector.connect(relay).await?;
        let published = publish_all(connection.as_mut(), events).await;
        let closed = connection.close().await;

        match published {
            Ok(()) => closed,
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "failed to close relay connection");
                }
                Err(e)
            }
        }
    }
}

async fn publish_all(connection: &mut dyn RelayConnection, events: &[Event]) -> Result<()> {
    for event in events {
        connection.publish(event).await?;
        tracing::debug!(event_id = %event.id, kind = %event.kind, "published");
    }
    Ok(())
}
