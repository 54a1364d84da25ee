//! Client and relay messages (NIP-01).

use serde::Serialize;
use serde_json::Value;

use crate::event::Event;
use crate::{Result, ZapError};

/// Messages this client sends.
#[derive(Debug)]
pub enum ClientMessage<'a> {
    /// `["EVENT", <event>]`
    Event(&'a Event),
}

impl ClientMessage<'_> {
    /// Wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for ClientMessage<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Event(event) => ("EVENT", event).serialize(serializer),
        }
    }
}

/// Messages a relay sends that matter for publishing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayMessage {
    /// `["OK", <event id>, <accepted>, <message>]`
    Ok {
        /// Id of the event being acknowledged
        event_id: String,
        /// Whether the relay stored the event
        accepted: bool,
        /// Human readable reason, may be empty
        message: String,
    },
    /// `["NOTICE", <message>]`
    Notice(String),
    /// Any other well-formed message (`EOSE`, `EVENT`, `AUTH`, ...).
    Other(String),
}

impl RelayMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let items = value
            .as_array()
            .ok_or_else(|| ZapError::malformed("relay message", "expected a JSON array"))?;
        let label = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ZapError::malformed("relay message", "missing message type"))?;

        match label {
            "OK" => {
                let event_id = items.get(1).and_then(Value::as_str);
                let accepted = items.get(2).and_then(Value::as_bool);
                match (event_id, accepted) {
                    (Some(event_id), Some(accepted)) => Ok(Self::Ok {
                        event_id: event_id.to_string(),
                        accepted,
                        message: items
                            .get(3)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    }),
                    _ => Err(ZapError::malformed("relay message", "malformed OK")),
                }
            }
            "NOTICE" => Ok(Self::Notice(
                items
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}
