//! Invoice creation on a Lightning node.
//!
//! The caller supplies the commitment pair, so the node never chooses the
//! preimage. The invoice commits to the zap request through
//! `description_hash = SHA-256(base64(description))`.

mod lnd;

pub use lnd::LndInvoiceService;

use async_trait::async_trait;
use base64::Engine;

use crate::crypto::Hasher;
use crate::preimage::CommitmentPair;
use crate::Result;

/// An invoice created for a zap attempt.
#[derive(Debug)]
pub struct Invoice {
    amount_msat: u64,
    commitment: CommitmentPair,
    description_hash: [u8; 32],
    payment_request: String,
    add_index: Option<u64>,
}

impl Invoice {
    /// Assemble an invoice from its parts.
    pub fn new(
        amount_msat: u64,
        commitment: CommitmentPair,
        description_hash: [u8; 32],
        payment_request: impl Into<String>,
    ) -> Self {
        Self {
            amount_msat,
            commitment,
            description_hash,
            payment_request: payment_request.into(),
            add_index: None,
        }
    }

    /// Record the node's invoice index.
    pub fn with_add_index(mut self, add_index: u64) -> Self {
        self.add_index = Some(add_index);
        self
    }

    /// Amount in millisatoshis.
    pub fn amount_msat(&self) -> u64 {
        self.amount_msat
    }

    /// The preimage and payment hash the invoice was created with.
    pub fn commitment(&self) -> &CommitmentPair {
        &self.commitment
    }

    /// Payment hash, equal to `SHA-256(preimage)`.
    pub fn payment_hash(&self) -> &[u8; 32] {
        self.commitment.hash()
    }

    /// The description hash the invoice commits to.
    pub fn description_hash(&self) -> &[u8; 32] {
        &self.description_hash
    }

    /// Bech32 payable invoice string.
    pub fn payment_request(&self) -> &str {
        &self.payment_request
    }

    /// Node-assigned invoice index, when reported.
    pub fn add_index(&self) -> Option<u64> {
        self.add_index
    }
}

/// Creates invoices bound to a caller-chosen commitment pair.
#[async_trait]
pub trait InvoiceService: Send + Sync {
    /// Create an invoice for `amount_msat` whose description hash commits
    /// to `description`.
    ///
    /// The pair is consumed: it belongs to this attempt only.
    async fn create_invoice(
        &self,
        pair: CommitmentPair,
        amount_msat: u64,
        description: &[u8],
    ) -> Result<Invoice>;
}

/// `SHA-256(base64(description))`.
pub fn description_hash(hasher: &dyn Hasher, description: &[u8]) -> [u8; 32] {
    let encoded = base64::engine::general_purpose::STANDARD.encode(description);
    hasher.sha256(encoded.as_bytes())
}
