//! Scriptable invoice service.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::crypto::Sha256Hasher;
use crate::invoice::{description_hash, Invoice, InvoiceService};
use crate::preimage::CommitmentPair;
use crate::{Result, ZapError};

/// One `create_invoice` call as seen by the mock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceCall {
    /// Requested amount.
    pub amount_msat: u64,
    /// Payment hash of the supplied pair.
    pub payment_hash: [u8; 32],
    /// Description bytes.
    pub description: Vec<u8>,
    /// `SHA-256(base64(description))`.
    pub description_hash: [u8; 32],
}

/// In-memory [`InvoiceService`].
///
/// Every call is recorded, including failed ones. Queued failures are
/// returned first, one per call; after that every call fails with the
/// persistent failure if one is set, and succeeds otherwise.
#[derive(Default)]
pub struct MockInvoiceService {
    calls: RwLock<Vec<InvoiceCall>>,
    queued: RwLock<VecDeque<ZapError>>,
    always: Option<fn() -> ZapError>,
}

impl MockInvoiceService {
    /// A service that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call (after previously queued failures) with `err`.
    pub fn fail_next(self, err: ZapError) -> Self {
        self.queued.write().unwrap().push_back(err);
        self
    }

    /// Fail every call not covered by a queued failure.
    pub fn fail_always(mut self, make_err: fn() -> ZapError) -> Self {
        self.always = Some(make_err);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<InvoiceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl InvoiceService for MockInvoiceService {
    async fn create_invoice(
        &self,
        pair: CommitmentPair,
        amount_msat: u64,
        description: &[u8],
    ) -> Result<Invoice> {
        let hash = description_hash(&Sha256Hasher, description);
        self.calls.write().unwrap().push(InvoiceCall {
            amount_msat,
            payment_hash: *pair.hash(),
            description: description.to_vec(),
            description_hash: hash,
        });

        if amount_msat == 0 {
            return Err(ZapError::malformed("amount", "must be positive"));
        }
        if let Some(err) = self.queued.write().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(make_err) = self.always {
            return Err(make_err());
        }

        let payment_request = format!("lnbcrt{}m1p{}", amount_msat, &pair.hash_hex()[..20]);
        let index = self.call_count() as u64;
        Ok(Invoice::new(amount_msat, pair, hash, payment_request).with_add_index(index))
    }
}
