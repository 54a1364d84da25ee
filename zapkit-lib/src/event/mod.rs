//! Nostr protocol messages.
//!
//! An [`UnsignedEvent`] becomes an [`Event`] by signing: the signer supplies
//! the `pubkey`, the id is the SHA-256 of the canonical serialization
//! `[0, pubkey, created_at, kind, tags, content]`, and the signature is a
//! BIP-340 Schnorr signature over that id.
//!
//! The wire form is a JSON object with the fields in the order
//! `id, pubkey, created_at, kind, tags, content, sig`. Serializing the same
//! [`Event`] always yields the same bytes.

mod tag;

pub use tag::{Tag, Tags};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{self, Hasher, Signer};
use crate::{Result, ZapError};

/// Event kind discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(pub u16);

impl Kind {
    /// Zap request (NIP-57).
    pub const ZAP_REQUEST: Kind = Kind(9734);
    /// Zap receipt (NIP-57).
    pub const ZAP_RECEIPT: Kind = Kind(9735);

    /// Numeric value.
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current unix time in whole seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// An event that has not been signed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedEvent {
    /// Creation time, unix seconds. Fixed before signing.
    pub created_at: i64,
    /// Event kind.
    pub kind: Kind,
    /// Ordered tags.
    pub tags: Tags,
    /// Content string.
    pub content: String,
}

impl UnsignedEvent {
    /// Create an unsigned event stamped with the current time.
    pub fn new(kind: Kind, tags: Tags, content: impl Into<String>) -> Self {
        Self {
            created_at: unix_now(),
            kind,
            tags,
            content: content.into(),
        }
    }

    /// Event id this event would have when signed by `pubkey`.
    pub fn id_for(&self, pubkey: &str, hasher: &dyn Hasher) -> Result<[u8; 32]> {
        compute_id(
            pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
            hasher,
        )
    }

    /// Sign with `signer`, which also determines the event's `pubkey`.
    pub fn sign(self, signer: &dyn Signer, hasher: &dyn Hasher) -> Result<Event> {
        let pubkey = signer.public_key();
        if !crypto::is_hex32(&pubkey) {
            return Err(ZapError::Signing(format!(
                "signer returned malformed public key '{}'",
                pubkey
            )));
        }
        let id = self.id_for(&pubkey, hasher)?;
        let sig = signer.sign(&id)?;

        Ok(Event {
            id: hex::encode(id),
            pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}

/// A signed event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Hex SHA-256 of the canonical serialization.
    pub id: String,
    /// Author x-only public key, hex.
    pub pubkey: String,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Event kind.
    pub kind: Kind,
    /// Ordered tags.
    pub tags: Tags,
    /// Content string.
    pub content: String,
    /// Hex Schnorr signature over `id`.
    pub sig: String,
}

impl Event {
    /// Wire-form JSON. Identical bytes for identical events.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the wire form. Does not verify.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Recompute the id from the event's fields.
    pub fn compute_id(&self, hasher: &dyn Hasher) -> Result<[u8; 32]> {
        compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
            hasher,
        )
    }

    /// Check that `id` matches the content and `sig` verifies for `pubkey`.
    pub fn verify(&self, hasher: &dyn Hasher) -> Result<()> {
        let id = self.compute_id(hasher)?;
        if hex::encode(id) != self.id {
            return Err(ZapError::malformed(
                "id",
                format!("event id {} does not match its content", self.id),
            ));
        }
        crypto::verify_signature(&self.pubkey, &id, &self.sig)
    }
}

/// Canonical serialization used for the event id.
pub fn canonical_json(
    pubkey: &str,
    created_at: i64,
    kind: Kind,
    tags: &Tags,
    content: &str,
) -> Result<String> {
    Ok(serde_json::to_string(&(
        0u8, pubkey, created_at, kind, tags, content,
    ))?)
}

fn compute_id(
    pubkey: &str,
    created_at: i64,
    kind: Kind,
    tags: &Tags,
    content: &str,
    hasher: &dyn Hasher,
) -> Result<[u8; 32]> {
    let canonical = canonical_json(pubkey, created_at, kind, tags, content)?;
    Ok(hasher.sha256(canonical.as_bytes()))
}
