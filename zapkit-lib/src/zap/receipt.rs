use crate::crypto::{Hasher, Signer};
use crate::event::{Kind, Tag, Tags, UnsignedEvent};
use crate::invoice::{description_hash, Invoice};
use crate::zap::{ZapReceipt, ZapRequest};
use crate::{Result, ZapError};

/// Builds and signs zap receipts.
///
/// Every receipt field is derived from the invoice and the signed request;
/// nothing is supplied separately.
pub struct ZapReceiptBuilder<'a> {
    hasher: &'a dyn Hasher,
    created_at: Option<i64>,
}

impl<'a> ZapReceiptBuilder<'a> {
    /// Create a builder that checks description hashes with `hasher`.
    pub fn new(hasher: &'a dyn Hasher) -> Self {
        Self {
            hasher,
            created_at: None,
        }
    }

    /// Use a fixed creation time instead of the current time.
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Assemble the unsigned receipt for `request`, paid through `invoice`.
    ///
    /// Fails with [`ZapError::MissingTag`] when the request has no `p` tag and
    /// with [`ZapError::MalformedInput`] when the invoice does not commit to
    /// the request's serialized form.
    pub fn build(&self, invoice: &Invoice, request: &ZapRequest) -> Result<UnsignedEvent> {
        let request_tags = request.tags();
        let p = request_tags
            .first("p")
            .filter(|t| t.value().is_some())
            .ok_or_else(|| ZapError::MissingTag("p".to_string()))?;

        let expected = description_hash(self.hasher, request.json().as_bytes());
        if invoice.description_hash() != &expected {
            return Err(ZapError::malformed(
                "description_hash",
                "invoice does not commit to this zap request",
            ));
        }

        let mut tags = Tags::new();
        tags.push(p.clone());
        if let Some(target) = request_tags.first("e").or_else(|| request_tags.first("a")) {
            tags.push(target.clone());
        }
        tags.push(Tag::new("bolt11", [invoice.payment_request()]));
        tags.push(Tag::new("description", [request.json()]));
        tags.push(Tag::new("preimage", [invoice.commitment().preimage_hex()]));

        let mut unsigned = UnsignedEvent::new(Kind::ZAP_RECEIPT, tags, "");
        if let Some(created_at) = self.created_at {
            unsigned.created_at = created_at;
        }
        Ok(unsigned)
    }

    /// Sign a receipt produced by [`build`](Self::build).
    pub fn sign(&self, unsigned: UnsignedEvent, signer: &dyn Signer) -> Result<ZapReceipt> {
        if unsigned.kind != Kind::ZAP_RECEIPT {
            return Err(ZapError::malformed("kind", "not a zap receipt"));
        }
        ZapReceipt::from_event(unsigned.sign(signer, self.hasher)?)
    }

    /// [`build`](Self::build) followed by [`sign`](Self::sign).
    pub fn build_signed(
        &self,
        invoice: &Invoice,
        request: &ZapRequest,
        signer: &dyn Signer,
    ) -> Result<ZapReceipt> {
        let unsigned = self.build(invoice, request)?;
        self.sign(unsigned, signer)
    }
}
