//! Fixed keys and sample requests.

use crate::crypto::{SecpSigner, Sha256Hasher, Signer};
use crate::zap::{ZapRequest, ZapRequestBuilder, ZapTarget};

/// Secret key of the zap sender in tests.
pub const SENDER_SECRET_HEX: &str =
    "7f7ff03d123792d6ac594bfa67bf6d0c0ab55b6b1fdb6249303fe861f1ccba9a";

/// Secret key of the receipt-signing service in tests.
pub const SERVICE_SECRET_HEX: &str =
    "3a5f1c8e2b7d49a06c1e8f4b2d7a9c3e5b1f0a8d6c4e2b9f7a5d3c1e0b8f6a4d";

/// Zap recipient.
pub const RECIPIENT_PUBKEY: &str =
    "f33c8a9617cb15f705fc70cd461cfd6eaf22f9e24c33eabad981648e5ec6f741";

/// Event being zapped.
pub const TARGET_EVENT_ID: &str =
    "25216d06287c98e91502ce675a613e5fc7a5124a8716848918ac232492926731";

/// Relay list used throughout the tests.
pub const TEST_RELAYS: [&str; 2] = ["wss://relay-a", "wss://relay-b"];

/// Amount used throughout the tests.
pub const TEST_AMOUNT_MSAT: u64 = 69420;

/// Signer for [`SENDER_SECRET_HEX`].
pub fn sender_signer() -> SecpSigner {
    SecpSigner::from_secret_hex(SENDER_SECRET_HEX).expect("sender fixture key is valid")
}

/// Signer for [`SERVICE_SECRET_HEX`].
pub fn service_signer() -> SecpSigner {
    SecpSigner::from_secret_hex(SERVICE_SECRET_HEX).expect("service fixture key is valid")
}

/// A signed request from the sender fixture to [`RECIPIENT_PUBKEY`].
pub fn signed_request(target: ZapTarget) -> ZapRequest {
    let signer = sender_signer();
    ZapRequestBuilder::new(
        signer.public_key(),
        RECIPIENT_PUBKEY,
        TEST_AMOUNT_MSAT,
        TEST_RELAYS.iter().map(|r| r.to_string()).collect(),
    )
    .target(target)
    .created_at(1_700_000_000)
    .build_signed(&signer, &Sha256Hasher)
    .expect("fixture request is valid")
}
