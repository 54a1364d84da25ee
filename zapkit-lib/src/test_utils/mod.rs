//! Test utilities for zapkit.
//!
//! This module provides:
//! - Fixed keys and identifiers for reproducible events
//! - A mock invoice service with scripted failures
//! - A mock relay connector that records what was published
//! - Assertions tying a receipt back to its request and invoice
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zapkit_lib::test_utils::{sender_signer, MockInvoiceService, MockRelayConnector};
//!
//! let invoices = Arc::new(MockInvoiceService::new());
//! let relay = Arc::new(MockRelayConnector::new());
//! // wire both into a ZapOrchestrator, run, then inspect relay.published()
//! ```

mod assertions;
mod fixtures;
mod mock_invoice;
mod mock_relay;

pub use assertions::{assert_receipt_links, assert_request_tags};
pub use fixtures::{
    sender_signer, service_signer, signed_request, RECIPIENT_PUBKEY, SENDER_SECRET_HEX,
    SERVICE_SECRET_HEX, TARGET_EVENT_ID, TEST_AMOUNT_MSAT, TEST_RELAYS,
};
pub use mock_invoice::{InvoiceCall, MockInvoiceService};
pub use mock_relay::{MockRelayConnector, PublishedEvent};
