//! Zap command - create, sign and publish a zap

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use zapkit_lib::invoice::description_hash;
use zapkit_lib::{
    CancelSignal, LndInvoiceService, RetryPolicy, SecpSigner, Sha256Hasher, Signer,
    WebSocketRelay, ZapConfig, ZapOrchestrator, ZapOutcome, ZapParams, ZapRequest, ZapTarget,
};

use crate::ui;

/// What to zap, as given on the command line.
#[derive(Debug, Clone)]
pub struct ZapOptions {
    pub recipient: String,
    pub amount_msat: u64,
    pub target: ZapTarget,
    pub content: String,
    pub lnurl: Option<String>,
    pub retries: u32,
    pub dry_run: bool,
}

impl ZapOptions {
    /// Orchestrator parameters for `sender`, announcing `relays`.
    pub fn params(&self, sender: String, relays: Vec<String>) -> ZapParams {
        let mut params = ZapParams::new(sender, self.recipient.clone(), self.amount_msat, relays)
            .target(self.target.clone())
            .content(self.content.clone());
        if let Some(lnurl) = &self.lnurl {
            params = params.lnurl(lnurl.clone());
        }
        params
    }
}

/// A signed request that was not sent anywhere.
#[derive(Debug)]
pub struct DryRun {
    pub request: ZapRequest,
    /// Hex SHA-256 of the base64-encoded request JSON, as an invoice would commit to it.
    pub description_hash: String,
}

/// Build and sign the zap request without contacting LND or any relay.
pub fn dry_run(signer: &dyn Signer, params: &ZapParams) -> Result<DryRun> {
    let request = params
        .request_builder()
        .build_signed(signer, &Sha256Hasher)?;
    let hash = description_hash(&Sha256Hasher, request.json().as_bytes());
    Ok(DryRun {
        request,
        description_hash: hex::encode(hash),
    })
}

#[tracing::instrument(
    skip_all,
    fields(recipient = %options.recipient, amount_msat = options.amount_msat)
)]
pub async fn run(config: &ZapConfig, options: &ZapOptions) -> Result<()> {
    ui::header("Zap");

    let signer: Arc<dyn Signer> = Arc::new(SecpSigner::from_secret_hex(
        config.require_private_key()?,
    )?);
    if config.relay.relays.is_empty() {
        bail!("no relays configured: pass --relay or set ZAPKIT_RELAYS");
    }

    let params = options.params(signer.public_key(), config.relay.relays.clone());
    ui::key_value("Sender", &params.sender);
    ui::key_value("Recipient", &params.recipient);
    ui::key_value("Amount", &format!("{} msat", params.amount_msat));
    ui::key_value("Target", &describe_target(&params.target));
    ui::key_value("Relay", &params.relays[0]);

    if options.dry_run {
        let preview = dry_run(signer.as_ref(), &params)?;
        ui::separator();
        ui::key_value("Description hash", &preview.description_hash);
        ui::json(preview.request.event())?;
        ui::info("Dry run: nothing was sent");
        return Ok(());
    }

    let invoices = Arc::new(LndInvoiceService::new(config.require_lnd()?.clone())?);
    let relays = Arc::new(WebSocketRelay::from_config(&config.relay));
    // zero backoff: wait as long as each failure suggests
    let retry = RetryPolicy::new(options.retries.saturating_add(1), Duration::ZERO);
    let orchestrator = ZapOrchestrator::new(signer, invoices, relays).with_retry_policy(retry);

    let cancel = CancelSignal::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current stage");
                cancel.cancel();
            }
        })
    };

    let outcome = orchestrator.run_with_cancel(params, &cancel).await;
    on_interrupt.abort();
    let outcome = outcome?;

    ui::separator();
    print_outcome(&outcome);
    ui::success("Zap request and receipt published");
    Ok(())
}

fn print_outcome(outcome: &ZapOutcome) {
    ui::key_value("Request", &outcome.request.event().id);
    ui::key_value("Receipt", &outcome.receipt.event().id);
    ui::key_value("Invoice", outcome.invoice.payment_request());
    ui::key_value("Payment hash", &hex::encode(outcome.invoice.payment_hash()));
    if let Some(index) = outcome.invoice.add_index() {
        ui::key_value("Add index", &index.to_string());
    }
    ui::key_value("Published to", &outcome.relay);
    if outcome.attempts > 1 {
        ui::warning(&format!("Succeeded after {} attempts", outcome.attempts));
    }
}

pub(crate) fn describe_target(target: &ZapTarget) -> String {
    match target {
        ZapTarget::Profile => "profile".to_string(),
        ZapTarget::Event(id) => format!("event {}", id),
        ZapTarget::Address(coordinate) => format!("address {}", coordinate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapkit_lib::test_utils::{
        assert_request_tags, sender_signer, RECIPIENT_PUBKEY, TARGET_EVENT_ID, TEST_AMOUNT_MSAT,
        TEST_RELAYS,
    };
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use zapkit_lib::Hasher;

    fn options(target: ZapTarget) -> ZapOptions {
        ZapOptions {
            recipient: RECIPIENT_PUBKEY.to_string(),
            amount_msat: TEST_AMOUNT_MSAT,
            target,
            content: "great post".to_string(),
            lnurl: None,
            retries: 0,
            dry_run: true,
        }
    }

    fn relays() -> Vec<String> {
        TEST_RELAYS.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_dry_run_signs_request() {
        let signer = sender_signer();
        let params = options(ZapTarget::Event(TARGET_EVENT_ID.to_string()))
            .params(signer.public_key(), relays());

        let preview = dry_run(&signer, &params).unwrap();
        let amount = TEST_AMOUNT_MSAT.to_string();
        assert_request_tags(
            &preview.request,
            &[
                &["p", RECIPIENT_PUBKEY],
                &["e", TARGET_EVENT_ID],
                &["relays", TEST_RELAYS[0], TEST_RELAYS[1]],
                &["amount", amount.as_str()],
            ],
        );
        assert_eq!(preview.request.event().content, "great post");
        assert_eq!(preview.request.event().pubkey, signer.public_key());
        preview.request.event().verify(&Sha256Hasher).unwrap();

        // invoices commit to SHA-256 of the base64 text, not of the raw JSON
        let encoded = BASE64.encode(preview.request.json());
        let expected = Sha256Hasher.sha256(encoded.as_bytes());
        assert_eq!(preview.description_hash, hex::encode(expected));
        let raw = Sha256Hasher.sha256(preview.request.json().as_bytes());
        assert_ne!(preview.description_hash, hex::encode(raw));
    }

    #[test]
    fn test_dry_run_rejects_bad_recipient() {
        let signer = sender_signer();
        let mut opts = options(ZapTarget::Profile);
        opts.recipient = "not-a-key".to_string();
        let params = opts.params(signer.public_key(), relays());
        assert!(dry_run(&signer, &params).is_err());
    }

    #[test]
    fn test_lnurl_is_carried() {
        let mut opts = options(ZapTarget::Profile);
        opts.lnurl = Some("lnurl1dp68gurn8ghj7".to_string());
        let params = opts.params("ab".repeat(32), relays());
        assert_eq!(params.lnurl.as_deref(), Some("lnurl1dp68gurn8ghj7"));
        assert_eq!(params.target, ZapTarget::Profile);
    }

    #[tokio::test]
    async fn test_run_requires_key_and_relays() {
        let opts = options(ZapTarget::Profile);
        assert!(run(&ZapConfig::default(), &opts).await.is_err());

        let config = ZapConfig {
            private_key_hex: Some(zapkit_lib::test_utils::SENDER_SECRET_HEX.to_string()),
            ..Default::default()
        };
        let err = run(&config, &opts).await.unwrap_err();
        assert!(err.to_string().contains("no relays"));
    }
}
