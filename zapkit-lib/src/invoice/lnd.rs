//! LND REST invoice adapter.
//!
//! Issues `POST {rest_url}/v1/invoices` authenticated with the
//! `grpc-metadata-macaroon` header. The commitment pair is supplied by the
//! caller, so LND records our preimage instead of generating its own.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{description_hash, Invoice, InvoiceService};
use crate::config::LndConfig;
use crate::crypto::{Hasher, Sha256Hasher};
use crate::preimage::CommitmentPair;
use crate::{Result, ZapError};

const MACAROON_HEADER: &str = "grpc-metadata-macaroon";

/// [`InvoiceService`] backed by an LND node's REST API.
pub struct LndInvoiceService {
    config: LndConfig,
    client: reqwest::Client,
    hasher: Box<dyn Hasher>,
}

impl LndInvoiceService {
    /// Create a service for the given node.
    pub fn new(config: LndConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(pem) = &config.tls_cert_pem {
            let cert = reqwest::Certificate::from_pem(pem.as_bytes())
                .map_err(|e| ZapError::Config(format!("invalid LND TLS certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| ZapError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            hasher: Box::new(Sha256Hasher),
        })
    }

    /// Use a different hasher for the description hash.
    pub fn with_hasher(mut self, hasher: Box<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &LndConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/v1/invoices", self.config.rest_url.trim_end_matches('/'))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> ZapError {
        if e.is_timeout() {
            ZapError::timeout("invoice request", self.config.timeout_secs * 1000)
        } else if e.is_connect() {
            ZapError::Transport(format!(
                "cannot connect to LND at {}: {}",
                self.config.rest_url, e
            ))
        } else {
            ZapError::Transport(format!("invoice request failed: {}", e))
        }
    }
}

#[async_trait]
impl InvoiceService for LndInvoiceService {
    #[tracing::instrument(
        name = "lnd_create_invoice",
        skip(self, pair, description),
        fields(rest_url = %self.config.rest_url)
    )]
    async fn create_invoice(
        &self,
        pair: CommitmentPair,
        amount_msat: u64,
        description: &[u8],
    ) -> Result<Invoice> {
        if amount_msat == 0 {
            return Err(ZapError::malformed("amount", "must be positive"));
        }

        let description_hash = description_hash(self.hasher.as_ref(), description);
        let body = AddInvoiceRequest {
            value: amount_msat,
            r_preimage: pair.preimage_base64(),
            r_hash: pair.hash_base64(),
            description_hash: b64(&description_hash),
        };

        tracing::debug!(payment_hash = %pair.hash_hex(), "requesting invoice");

        let response = self
            .client
            .post(self.url())
            .header(MACAROON_HEADER, &self.config.macaroon_hex)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "LND rejected invoice request");
            return Err(ZapError::service(Some(status.as_u16()), lnd_message(&text)));
        }

        let parsed: AddInvoiceResponse = serde_json::from_str(&text).map_err(|e| {
            ZapError::service(Some(status.as_u16()), format!("unparsable response: {}", e))
        })?;

        if parsed.payment_request.is_empty() {
            return Err(ZapError::service(
                Some(status.as_u16()),
                "response has no payment_request",
            ));
        }
        if let Some(r_hash) = parsed.r_hash.as_deref().filter(|h| !h.is_empty()) {
            if decode_b64(r_hash).as_deref() != Some(pair.hash().as_slice()) {
                return Err(ZapError::service(
                    Some(status.as_u16()),
                    "returned r_hash does not match the supplied payment hash",
                ));
            }
        }
        if let Some(r_preimage) = parsed.r_preimage.as_deref().filter(|p| !p.is_empty()) {
            let matches = decode_b64(r_preimage)
                .map(|bytes| pair.matches_preimage(&bytes))
                .unwrap_or(false);
            if !matches {
                return Err(ZapError::service(
                    Some(status.as_u16()),
                    "returned r_preimage does not match the supplied preimage",
                ));
            }
        }

        let add_index = parsed.add_index.as_ref().and_then(U64Field::get);
        tracing::info!(payment_hash = %pair.hash_hex(), ?add_index, "invoice created");

        let mut invoice = Invoice::new(amount_msat, pair, description_hash, parsed.payment_request);
        if let Some(index) = add_index {
            invoice = invoice.with_add_index(index);
        }
        Ok(invoice)
    }
}

#[derive(Serialize)]
struct AddInvoiceRequest {
    value: u64,
    r_preimage: String,
    r_hash: String,
    description_hash: String,
}

#[derive(Deserialize)]
struct AddInvoiceResponse {
    #[serde(default)]
    payment_request: String,
    #[serde(default)]
    r_hash: Option<String>,
    #[serde(default)]
    r_preimage: Option<String>,
    #[serde(default)]
    add_index: Option<U64Field>,
}

/// LND encodes 64-bit integers as JSON strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum U64Field {
    Number(u64),
    Text(String),
}

impl U64Field {
    fn get(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct LndErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull the human readable message out of an LND error body.
fn lnd_message(body: &str) -> String {
    serde_json::from_str::<LndErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.trim().to_string())
}

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn decode_b64(value: &str) -> Option<Vec<u8>> {
    let engine = &base64::engine::general_purpose::STANDARD;
    engine
        .decode(value)
        .ok()
        // grpc-gateway may emit URL-safe base64 for bytes fields
        .or_else(|| base64::engine::general_purpose::URL_SAFE.decode(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_config() {
        assert!(LndInvoiceService::new(LndConfig::new("", "ab")).is_err());
        assert!(LndInvoiceService::new(LndConfig::new("https://localhost:8080", "")).is_err());
        assert!(LndInvoiceService::new(LndConfig::new("https://localhost:8080", "ab")).is_ok());
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let service =
            LndInvoiceService::new(LndConfig::new("https://localhost:8080/", "ab")).unwrap();
        assert_eq!(service.url(), "https://localhost:8080/v1/invoices");
    }

    #[test]
    fn test_request_body_shape() {
        let pair = CommitmentPair::from_preimage([0u8; 32]);
        let body = AddInvoiceRequest {
            value: 69420,
            r_preimage: pair.preimage_base64(),
            r_hash: pair.hash_base64(),
            description_hash: b64(&[0u8; 32]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["value"], 69420);
        assert_eq!(
            json["r_preimage"],
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
        );
        assert_eq!(json["r_hash"], pair.hash_base64());
    }

    #[test]
    fn test_lnd_message() {
        assert_eq!(
            lnd_message(r#"{"code":2,"message":"invoice with payment hash already exists"}"#),
            "invoice with payment hash already exists"
        );
        assert_eq!(lnd_message("  gateway error \n"), "gateway error");
    }

    #[test]
    fn test_add_index_formats() {
        let parsed: AddInvoiceResponse =
            serde_json::from_str(r#"{"payment_request":"lnbc1","add_index":"17"}"#).unwrap();
        assert_eq!(parsed.add_index.as_ref().and_then(U64Field::get), Some(17));

        let parsed: AddInvoiceResponse =
            serde_json::from_str(r#"{"payment_request":"lnbc1","add_index":9}"#).unwrap();
        assert_eq!(parsed.add_index.as_ref().and_then(U64Field::get), Some(9));
    }
}
