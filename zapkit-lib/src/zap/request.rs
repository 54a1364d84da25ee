use crate::crypto::{self, Hasher, Signer};
use crate::event::{Kind, Tag, Tags, UnsignedEvent};
use crate::zap::{ZapRequest, ZapTarget};
use crate::{Result, ZapError};

/// Builds and signs zap requests.
///
/// Tags are emitted in a fixed order: `p`, then `e` or `a`, then `relays`,
/// then `amount`, then `lnurl` when set.
#[derive(Clone, Debug)]
pub struct ZapRequestBuilder {
    sender: String,
    recipient: String,
    amount_msat: u64,
    relays: Vec<String>,
    target: ZapTarget,
    content: String,
    lnurl: Option<String>,
    created_at: Option<i64>,
}

impl ZapRequestBuilder {
    /// Start a request from `sender` to `recipient` (both hex public keys).
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount_msat: u64,
        relays: Vec<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount_msat,
            relays,
            target: ZapTarget::Profile,
            content: String::new(),
            lnurl: None,
            created_at: None,
        }
    }

    /// Attach the zap to an event or address instead of the profile.
    pub fn target(mut self, target: ZapTarget) -> Self {
        self.target = target;
        self
    }

    /// Set the zap comment.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Add the recipient's bech32 lnurl.
    pub fn lnurl(mut self, lnurl: impl Into<String>) -> Self {
        self.lnurl = Some(lnurl.into());
        self
    }

    /// Use a fixed creation time instead of the current time.
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validate inputs and assemble the unsigned request.
    pub fn build(&self) -> Result<UnsignedEvent> {
        self.validate()?;

        let mut tags = Tags::new();
        tags.push(Tag::new("p", [self.recipient.as_str()]));
        match &self.target {
            ZapTarget::Profile => {}
            ZapTarget::Event(id) => tags.push(Tag::new("e", [id.as_str()])),
            ZapTarget::Address(coord) => tags.push(Tag::new("a", [coord.as_str()])),
        }
        tags.push(Tag::new("relays", self.relays.iter().map(String::as_str)));
        tags.push(Tag::new("amount", [self.amount_msat.to_string()]));
        if let Some(lnurl) = &self.lnurl {
            tags.push(Tag::new("lnurl", [lnurl.as_str()]));
        }

        let mut unsigned = UnsignedEvent::new(Kind::ZAP_REQUEST, tags, self.content.clone());
        if let Some(created_at) = self.created_at {
            unsigned.created_at = created_at;
        }
        Ok(unsigned)
    }

    /// Sign a request produced by [`build`](Self::build).
    ///
    /// The signer must hold the sender's key.
    pub fn sign(
        &self,
        unsigned: UnsignedEvent,
        signer: &dyn Signer,
        hasher: &dyn Hasher,
    ) -> Result<ZapRequest> {
        if unsigned.kind != Kind::ZAP_REQUEST {
            return Err(ZapError::malformed("kind", "not a zap request"));
        }
        let signer_key = signer.public_key();
        if signer_key != self.sender {
            return Err(ZapError::Signing(format!(
                "signing key {} does not belong to sender {}",
                signer_key, self.sender
            )));
        }
        ZapRequest::from_event(unsigned.sign(signer, hasher)?)
    }

    /// [`build`](Self::build) followed by [`sign`](Self::sign).
    pub fn build_signed(&self, signer: &dyn Signer, hasher: &dyn Hasher) -> Result<ZapRequest> {
        let unsigned = self.build()?;
        self.sign(unsigned, signer, hasher)
    }

    fn validate(&self) -> Result<()> {
        if !crypto::is_hex32(&self.sender) {
            return Err(ZapError::malformed("sender", "expected 64 hex characters"));
        }
        if !crypto::is_hex32(&self.recipient) {
            return Err(ZapError::malformed(
                "recipient",
                "expected 64 hex characters",
            ));
        }
        if self.amount_msat == 0 {
            return Err(ZapError::malformed("amount", "must be positive"));
        }
        if self.relays.is_empty() {
            return Err(ZapError::malformed("relays", "at least one relay is required"));
        }
        if let Some(bad) = self.relays.iter().find(|r| !is_relay_uri(r)) {
            return Err(ZapError::malformed(
                "relays",
                format!("'{}' is not a ws:// or wss:// URI", bad),
            ));
        }
        match &self.target {
            ZapTarget::Profile => {}
            ZapTarget::Event(id) if !crypto::is_hex32(id) => {
                return Err(ZapError::malformed("event id", "expected 64 hex characters"));
            }
            ZapTarget::Event(_) => {}
            ZapTarget::Address(coord) => validate_coordinate(coord)?,
        }
        Ok(())
    }
}

/// Returns true for `ws://host...` and `wss://host...`.
pub(crate) fn is_relay_uri(uri: &str) -> bool {
    let rest = uri
        .strip_prefix("wss://")
        .or_else(|| uri.strip_prefix("ws://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

fn validate_coordinate(coord: &str) -> Result<()> {
    let mut parts = coord.splitn(3, ':');
    let kind = parts.next().unwrap_or_default();
    let pubkey = parts.next().unwrap_or_default();
    if parts.next().is_none() || kind.parse::<u16>().is_err() || !crypto::is_hex32(pubkey) {
        return Err(ZapError::malformed(
            "address",
            format!("'{}' is not a <kind>:<pubkey>:<d> coordinate", coord),
        ));
    }
    Ok(())
}
