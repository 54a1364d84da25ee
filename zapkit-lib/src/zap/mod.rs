//! Zap requests (kind 9734) and zap receipts (kind 9735).
//!
//! A [`ZapRequest`] keeps the exact JSON it was serialized to when it was
//! created. That string is the invoice description and the receipt's
//! `description` tag, so both always commit to the same bytes.

mod receipt;
mod request;
mod validate;

pub use receipt::ZapReceiptBuilder;
pub use request::ZapRequestBuilder;
pub(crate) use request::is_relay_uri;
pub use validate::validate_receipt;

use crate::event::{Event, Kind, Tags};
use crate::{Result, ZapError};

/// What a zap is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ZapTarget {
    /// The recipient's profile; no `e` or `a` tag.
    #[default]
    Profile,
    /// A specific event, by hex id (`e` tag).
    Event(String),
    /// A parameterized replaceable event, by `<kind>:<pubkey>:<d>` coordinate (`a` tag).
    Address(String),
}

/// Signed zap request together with its serialized form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZapRequest {
    event: Event,
    json: String,
}

impl ZapRequest {
    /// Wrap a signed kind-9734 event, serializing it once.
    pub fn from_event(event: Event) -> Result<Self> {
        if event.kind != Kind::ZAP_REQUEST {
            return Err(ZapError::malformed(
                "kind",
                format!("expected {}, got {}", Kind::ZAP_REQUEST, event.kind),
            ));
        }
        let json = event.to_json()?;
        Ok(Self { event, json })
    }

    /// Parse a serialized request, keeping the given string verbatim.
    pub fn from_json(json: impl Into<String>) -> Result<Self> {
        let json = json.into();
        let event = Event::from_json(&json)?;
        if event.kind != Kind::ZAP_REQUEST {
            return Err(ZapError::malformed(
                "kind",
                format!("expected {}, got {}", Kind::ZAP_REQUEST, event.kind),
            ));
        }
        Ok(Self { event, json })
    }

    /// The signed event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Exact serialized bytes used for the description hash and the receipt.
    pub fn json(&self) -> &str {
        &self.json
    }

    /// Request tags.
    pub fn tags(&self) -> &Tags {
        &self.event.tags
    }

    /// Recipient public key from the first `p` tag.
    pub fn recipient(&self) -> Option<&str> {
        self.event.tags.first_value("p")
    }

    /// Amount in millisatoshis from the first `amount` tag.
    pub fn amount_msat(&self) -> Option<u64> {
        self.event
            .tags
            .first_value("amount")
            .and_then(|a| a.parse().ok())
    }

    /// Relays listed in the first `relays` tag.
    pub fn relays(&self) -> &[String] {
        self.event
            .tags
            .first("relays")
            .map(|t| t.values())
            .unwrap_or(&[])
    }

    /// Target derived from the first `e` tag, else the first `a` tag.
    pub fn target(&self) -> ZapTarget {
        if let Some(id) = self.event.tags.first_value("e") {
            ZapTarget::Event(id.to_string())
        } else if let Some(coord) = self.event.tags.first_value("a") {
            ZapTarget::Address(coord.to_string())
        } else {
            ZapTarget::Profile
        }
    }
}

/// Signed zap receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZapReceipt {
    event: Event,
}

impl ZapReceipt {
    /// Wrap a signed kind-9735 event.
    pub fn from_event(event: Event) -> Result<Self> {
        if event.kind != Kind::ZAP_RECEIPT {
            return Err(ZapError::malformed(
                "kind",
                format!("expected {}, got {}", Kind::ZAP_RECEIPT, event.kind),
            ));
        }
        Ok(Self { event })
    }

    /// The signed event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Payable invoice string from the `bolt11` tag.
    pub fn bolt11(&self) -> Option<&str> {
        self.event.tags.first_value("bolt11")
    }

    /// Embedded request JSON from the `description` tag.
    pub fn description(&self) -> Option<&str> {
        self.event.tags.first_value("description")
    }

    /// Hex preimage from the `preimage` tag.
    pub fn preimage_hex(&self) -> Option<&str> {
        self.event.tags.first_value("preimage")
    }
}
