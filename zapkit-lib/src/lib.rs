//! Zapkit library.
//!
//! Produces the linked pair of signed Nostr events behind a Lightning zap: a
//! zap request (kind 9734) and a zap receipt (kind 9735), tied together by an
//! invoice whose description hash commits to the request.
//!
//! Collaborators are injected through traits: signing and hashing through
//! [`Signer`] and [`Hasher`], invoice creation through [`InvoiceService`], and
//! relay access through [`RelayConnector`]. The crate keeps no state between
//! runs.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zapkit_lib::{LndConfig, LndInvoiceService, SecpSigner, WebSocketRelay};
//! use zapkit_lib::{ZapOrchestrator, ZapParams};
//!
//! let signer = Arc::new(SecpSigner::from_secret_hex(&secret_hex)?);
//! let invoices = Arc::new(LndInvoiceService::new(LndConfig::new(url, macaroon))?);
//! let relays = Arc::new(WebSocketRelay::default());
//!
//! let orchestrator = ZapOrchestrator::new(signer.clone(), invoices, relays);
//! let params = ZapParams::new(
//!     signer.public_key(),
//!     recipient,
//!     21_000,
//!     vec!["wss://relay.damus.io".into()],
//! );
//! let outcome = orchestrator.run(params).await?;
//! println!("receipt {}", outcome.receipt.event().id);
//! ```

pub mod config;
pub mod crypto;
pub mod errors;
pub mod event;
pub mod invoice;
pub mod orchestrator;
pub mod preimage;
pub mod publisher;
pub mod relay;
pub mod zap;

/// Mock collaborators and key fixtures.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{LndConfig, RelayConfig, ZapConfig};
pub use crypto::{Hasher, SecpSigner, Sha256Hasher, Signer};
pub use errors::{Stage, ZapError, ZapErrorCode};
pub use event::{Event, Kind, Tag, Tags, UnsignedEvent};
pub use invoice::{Invoice, InvoiceService, LndInvoiceService};
pub use orchestrator::{CancelSignal, RetryPolicy, ZapOrchestrator, ZapOutcome, ZapParams};
pub use preimage::CommitmentPair;
pub use publisher::Publisher;
pub use relay::{RelayConnection, RelayConnector, WebSocketRelay};
pub use zap::{
    validate_receipt, ZapReceipt, ZapReceiptBuilder, ZapRequest, ZapRequestBuilder, ZapTarget,
};

/// Common result alias for zap operations.
pub type Result<T> = std::result::Result<T, ZapError>;
