use crate::crypto::Hasher;
use crate::event::Event;
use crate::zap::{ZapReceipt, ZapRequest};
use crate::{Result, ZapError};

/// Check a published zap receipt and return the request it embeds.
///
/// Verifies the receipt's id and signature, parses and verifies the
/// `description` request, checks that the receipt's `p` and `e`/`a` tags are
/// the request's, and that `preimage` is 32 bytes of hex. When
/// `expected_signer` is given, the receipt must be signed by that key.
pub fn validate_receipt(
    event: &Event,
    hasher: &dyn Hasher,
    expected_signer: Option<&str>,
) -> Result<ZapRequest> {
    let receipt = ZapReceipt::from_event(event.clone())?;
    event.verify(hasher)?;

    if let Some(expected) = expected_signer {
        if event.pubkey != expected {
            return Err(ZapError::malformed(
                "pubkey",
                format!("receipt signed by {}, expected {}", event.pubkey, expected),
            ));
        }
    }

    let description = receipt
        .description()
        .ok_or_else(|| ZapError::MissingTag("description".to_string()))?;
    let request = ZapRequest::from_json(description)?;
    request.event().verify(hasher)?;

    let receipt_p = event
        .tags
        .first_value("p")
        .ok_or_else(|| ZapError::MissingTag("p".to_string()))?;
    if request.recipient() != Some(receipt_p) {
        return Err(ZapError::malformed(
            "p",
            "receipt recipient differs from the zap request",
        ));
    }

    let receipt_target = event
        .tags
        .first("e")
        .or_else(|| event.tags.first("a"));
    let request_target = request
        .tags()
        .first("e")
        .or_else(|| request.tags().first("a"));
    if receipt_target != request_target {
        return Err(ZapError::malformed(
            "target",
            "receipt e/a tag differs from the zap request",
        ));
    }

    if receipt.bolt11().is_none() {
        return Err(ZapError::MissingTag("bolt11".to_string()));
    }

    let preimage = receipt
        .preimage_hex()
        .ok_or_else(|| ZapError::MissingTag("preimage".to_string()))?;
    match hex::decode(preimage) {
        Ok(bytes) if bytes.len() == 32 => {}
        _ => {
            return Err(ZapError::malformed(
                "preimage",
                "expected 32 bytes of hex",
            ))
        }
    }

    Ok(request)
}
