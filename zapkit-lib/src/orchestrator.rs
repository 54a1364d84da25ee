//! End-to-end zap attempts.
//!
//! One attempt runs the stages in order: generate a commitment pair, build
//! and sign the zap request, create the invoice committing to the request,
//! build and sign the receipt, then publish request and receipt to the first
//! relay. Any failure ends the attempt and is returned wrapped in
//! [`ZapError::Stage`].
//!
//! Retrying is only done here, only for retryable invoice failures, and
//! always restarts from a fresh commitment pair. Nothing is rolled back: a
//! pair that reached the invoice service is simply abandoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::{Hasher, Sha256Hasher, Signer};
use crate::errors::StageExt;
use crate::invoice::{Invoice, InvoiceService};
use crate::preimage::CommitmentPair;
use crate::publisher::Publisher;
use crate::relay::RelayConnector;
use crate::zap::{ZapReceipt, ZapReceiptBuilder, ZapRequest, ZapRequestBuilder, ZapTarget};
use crate::{Result, Stage, ZapError};

/// Inputs of a zap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZapParams {
    /// Sender public key, hex. Must belong to the orchestrator's signer.
    pub sender: String,
    /// Recipient public key, hex.
    pub recipient: String,
    /// Amount in millisatoshis.
    pub amount_msat: u64,
    /// Relays for the request's `relays` tag. Events are published to the first.
    pub relays: Vec<String>,
    /// What is being zapped.
    pub target: ZapTarget,
    /// Zap comment.
    pub content: String,
    /// Recipient lnurl, if known.
    pub lnurl: Option<String>,
}

impl ZapParams {
    /// Profile zap with an empty comment.
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
        }
    }

    /// Zap an event or address.
    pub fn target(mut self, target: ZapTarget) -> Self {
        self.target = target;
        self
    }

    /// Set the comment.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the recipient lnurl.
    pub fn lnurl(mut self, lnurl: impl Into<String>) -> Self {
        self.lnurl = Some(lnurl.into());
        self
    }

    /// Request builder for these parameters, with the current time.
    pub fn request_builder(&self) -> ZapRequestBuilder {
        let mut builder = ZapRequestBuilder::new(
            self.sender.clone(),
            self.recipient.clone(),
            self.amount_msat,
            self.relays.clone(),
        )
        .target(self.target.clone())
        .content(self.content.clone());
        if let Some(lnurl) = &self.lnurl {
            builder = builder.lnurl(lnurl.clone());
        }
        builder
    }
}

/// Result of a completed zap.
#[derive(Debug)]
pub struct ZapOutcome {
    /// The signed, published request.
    pub request: ZapRequest,
    /// The invoice committing to the request.
    pub invoice: Invoice,
    /// The signed, published receipt.
    pub receipt: ZapReceipt,
    /// Relay both events were published to.
    pub relay: String,
    /// Number of attempts made, starting at 1.
    pub attempts: u32,
}

/// How often a zap may be restarted after a retryable invoice failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry. Zero
    /// defers to the failing error's [`ZapError::retry_after_ms`] hint.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Up to `max_attempts` attempts with exponential backoff.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based) ended in `err`.
    pub fn delay_for(&self, attempt: u32, err: &ZapError) -> Duration {
        let base = if self.backoff.is_zero() {
            Duration::from_millis(err.retry_after_ms().unwrap_or(0))
        } else {
            self.backoff
        };
        let exp = attempt.saturating_sub(1).min(16);
        base.saturating_mul(1u32 << exp)
    }

    fn should_retry(&self, attempt: u32, err: &ZapError) -> bool {
        attempt < self.max_attempts.max(1)
            && err.stage() == Some(Stage::Invoice)
            && err.is_retryable()
    }
}

/// Cooperative cancellation shared between a caller and running attempts.
///
/// Checked between stages. A publish that has started runs to completion so
/// the relay connection is always released.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// A signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, next: Stage) -> Result<()> {
        if self.is_cancelled() {
            return Err(ZapError::Cancelled.in_stage(next));
        }
        Ok(())
    }
}

/// Runs zap attempts against injected collaborators.
///
/// Holds no per-attempt state; one orchestrator can serve concurrent runs.
pub struct ZapOrchestrator {
    signer: Arc<dyn Signer>,
    receipt_signer: Arc<dyn Signer>,
    hasher: Arc<dyn Hasher>,
    invoices: Arc<dyn InvoiceService>,
    publisher: Publisher,
    retry: RetryPolicy,
}

impl ZapOrchestrator {
    /// Create an orchestrator that signs both events with `signer`.
    pub fn new(
        signer: Arc<dyn Signer>,
        invoices: Arc<dyn InvoiceService>,
        relays: Arc<dyn RelayConnector>,
    ) -> Self {
        Self {
            receipt_signer: signer.clone(),
            signer,
            hasher: Arc::new(Sha256Hasher),
            invoices,
            publisher: Publisher::new(relays),
            retry: RetryPolicy::default(),
        }
    }

    /// Sign receipts with a different key than requests.
    pub fn with_receipt_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.receipt_signer = signer;
        self
    }

    /// Replace the hasher used for ids and description hashes.
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Public key that signs zap requests.
    pub fn sender_pubkey(&self) -> String {
        self.signer.public_key()
    }

    /// Run a zap to completion.
    pub async fn run(&self, params: ZapParams) -> Result<ZapOutcome> {
        self.run_with_cancel(params, &CancelSignal::new()).await
    }

    /// Run a zap, giving up between stages once `cancel` fires.
    #[tracing::instrument(
        name = "zap",
        skip_all,
        fields(recipient = %params.recipient, amount_msat = params.amount_msat)
    )]
    pub async fn run_with_cancel(
        &self,
        params: ZapParams,
        cancel: &CancelSignal,
    ) -> Result<ZapOutcome> {
        let builder = params.request_builder();
        let mut attempt = 1;

        loop {
            match self.attempt(&builder, &params, cancel).await {
                Ok((request, invoice, receipt, relay)) => {
                    tracing::info!(
                        attempt,
                        request_id = %request.event().id,
                        receipt_id = %receipt.event().id,
                        %relay,
                        "zap published"
                    );
                    return Ok(ZapOutcome {
                        request,
                        invoice,
                        receipt,
                        relay,
                        attempts: attempt,
                    });
                }
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let delay = self.retry.delay_for(attempt, &err);
                    tracing::warn!(
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "invoice creation failed, restarting with a fresh commitment pair"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "zap failed");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(
        &self,
        builder: &ZapRequestBuilder,
        params: &ZapParams,
        cancel: &CancelSignal,
    ) -> Result<(ZapRequest, Invoice, ZapReceipt, String)> {
        cancel.check(Stage::Preimage)?;
        let pair = CommitmentPair::generate().stage(Stage::Preimage)?;

        cancel.check(Stage::Request)?;
        let request = builder
            .build_signed(self.signer.as_ref(), self.hasher.as_ref())
            .stage(Stage::Request)?;
        tracing::debug!(request_id = %request.event().id, "zap request signed");

        cancel.check(Stage::Invoice)?;
        let invoice = self
            .invoices
            .create_invoice(pair, params.amount_msat, request.json().as_bytes())
            .await
            .stage(Stage::Invoice)?;
        tracing::debug!(payment_hash = %invoice.commitment().hash_hex(), "invoice created");

        cancel.check(Stage::Receipt)?;
        let receipt = ZapReceiptBuilder::new(self.hasher.as_ref())
            .build_signed(&invoice, &request, self.receipt_signer.as_ref())
            .stage(Stage::Receipt)?;
        tracing::debug!(receipt_id = %receipt.event().id, "zap receipt signed");

        cancel.check(Stage::Publish)?;
        let relay = params
            .relays
            .first()
            .cloned()
            .ok_or_else(|| ZapError::malformed("relays", "at least one relay is required"))
            .stage(Stage::Publish)?;
        let events = [request.event().clone(), receipt.event().clone()];
        self.publisher
            .publish(&relay, &events)
            .await
            .stage(Stage::Publish)?;

        Ok((request, invoice, receipt, relay))
    }
}
