//! Assertions over zap artifacts.

use crate::crypto::Sha256Hasher;
use crate::invoice::{description_hash, Invoice};
use crate::zap::{ZapReceipt, ZapRequest};

/// Assert that a request carries exactly `expected` as its tags.
///
/// # Panics
/// Panics if any tag differs.
pub fn assert_request_tags(request: &ZapRequest, expected: &[&[&str]]) {
    let actual: Vec<Vec<&str>> = request
        .tags()
        .iter()
        .map(|t| t.0.iter().map(String::as_str).collect())
        .collect();
    let expected: Vec<Vec<&str>> = expected.iter().map(|t| t.to_vec()).collect();
    assert_eq!(actual, expected, "zap request tags differ");
}

/// Assert that `receipt` was derived from `request` and `invoice`.
///
/// # Panics
/// Panics if the receipt's tags do not match the request byte for byte, or
/// if the invoice does not commit to the request.
pub fn assert_receipt_links(request: &ZapRequest, invoice: &Invoice, receipt: &ZapReceipt) {
    let tags = &receipt.event().tags;

    assert_eq!(
        tags.first("p"),
        request.tags().first("p"),
        "receipt p tag should equal the request's"
    );
    assert_eq!(
        tags.first("e").or_else(|| tags.first("a")),
        request
            .tags()
            .first("e")
            .or_else(|| request.tags().first("a")),
        "receipt e/a tag should equal the request's"
    );
    assert_eq!(
        receipt.bolt11(),
        Some(invoice.payment_request()),
        "bolt11 should be the invoice's payment request"
    );
    assert_eq!(
        receipt.description(),
        Some(request.json()),
        "description should be the exact request JSON"
    );
    assert_eq!(
        receipt.preimage_hex(),
        Some(invoice.commitment().preimage_hex().as_str()),
        "preimage should be the invoice's preimage"
    );
    assert_eq!(
        invoice.description_hash(),
        &description_hash(&Sha256Hasher, request.json().as_bytes()),
        "invoice should commit to the request JSON"
    );
}
