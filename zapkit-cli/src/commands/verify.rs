//! Verify command - check a zap receipt against the request it embeds

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use zapkit_lib::{validate_receipt, Event, Sha256Hasher, ZapReceipt, ZapRequest};

use super::zap::describe_target;
use crate::ui;

/// A receipt that passed validation.
#[derive(Debug)]
pub struct VerifiedReceipt {
    pub receipt: ZapReceipt,
    pub request: ZapRequest,
}

/// Validate a receipt given as event JSON.
pub fn verify_json(json: &str, expected_signer: Option<&str>) -> Result<VerifiedReceipt> {
    let event = Event::from_json(json.trim())?;
    let request = validate_receipt(&event, &Sha256Hasher, expected_signer)?;
    let receipt = ZapReceipt::from_event(event)?;
    Ok(VerifiedReceipt { receipt, request })
}

/// Read a receipt from `path` (`-` for stdin) and validate it.
pub fn run(path: &Path, expected_signer: Option<&str>) -> Result<()> {
    ui::header("Verify Zap Receipt");

    let json = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading receipt from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading receipt from {}", path.display()))?
    };

    let verified = verify_json(&json, expected_signer)?;
    let receipt = verified.receipt.event();
    let request = &verified.request;

    ui::key_value("Receipt", &receipt.id);
    ui::key_value("Signed by", &receipt.pubkey);
    ui::key_value("Created", &format_timestamp(receipt.created_at));
    ui::separator();
    ui::key_value("Request", &request.event().id);
    ui::key_value("Sender", &request.event().pubkey);
    ui::key_value("Recipient", request.recipient().unwrap_or("-"));
    if let Some(amount) = request.amount_msat() {
        ui::key_value("Amount", &format!("{} msat", amount));
    }
    ui::key_value("Target", &describe_target(&request.target()));
    if !request.event().content.is_empty() {
        ui::key_value("Comment", &request.event().content);
    }
    if let Some(bolt11) = verified.receipt.bolt11() {
        ui::key_value("Invoice", bolt11);
    }

    ui::success("Receipt is valid");
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapkit_lib::invoice::{description_hash, Invoice};
    use zapkit_lib::test_utils::{service_signer, signed_request, TARGET_EVENT_ID};
    use zapkit_lib::{CommitmentPair, Signer, ZapReceiptBuilder, ZapTarget};

    fn receipt_json() -> (String, ZapRequest) {
        let request = signed_request(ZapTarget::Event(TARGET_EVENT_ID.to_string()));
        let invoice = Invoice::new(
            21_000,
            CommitmentPair::from_preimage([9u8; 32]),
            description_hash(&Sha256Hasher, request.json().as_bytes()),
            "lnbcrt210n1pverify",
        );
        let receipt = ZapReceiptBuilder::new(&Sha256Hasher)
            .build_signed(&invoice, &request, &service_signer())
            .unwrap();
        (receipt.event().to_json().unwrap(), request)
    }

    #[test]
    fn test_verify_valid_receipt() {
        let (json, request) = receipt_json();
        let verified = verify_json(&json, None).unwrap();
        assert_eq!(verified.request, request);
        assert_eq!(verified.receipt.bolt11(), Some("lnbcrt210n1pverify"));

        let signer = service_signer().public_key();
        verify_json(&json, Some(&signer)).unwrap();
    }

    #[test]
    fn test_verify_rejects_wrong_signer() {
        let (json, _) = receipt_json();
        let other = "ab".repeat(32);
        assert!(verify_json(&json, Some(&other)).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(verify_json("not json", None).is_err());
        assert!(verify_json("{}", None).is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
    }
}
