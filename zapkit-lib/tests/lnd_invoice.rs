//! Integration tests for the LND REST invoice adapter.
//!
//! Mock tests run against a local `wiremock` server. The test against a real
//! node is `#[ignore]`d and needs:
//!
//! ```bash
//! export ZAPKIT_LND_URL=https://localhost:8081
//! export ZAPKIT_LND_MACAROON=0201036c6e6402...
//! export ZAPKIT_LND_ACCEPT_INVALID_CERTS=true
//! cargo test -p zapkit-lib --test lnd_invoice -- --ignored
//! ```

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use zapkit_lib::invoice::description_hash;
use zapkit_lib::{
    CommitmentPair, InvoiceService, LndConfig, LndInvoiceService, Sha256Hasher, ZapConfig,
    ZapError,
};

const MACAROON: &str = "0201036c6e64";

fn service(server: &MockServer) -> LndInvoiceService {
    LndInvoiceService::new(LndConfig::new(server.uri(), MACAROON).with_timeout(2)).unwrap()
}

/// Answers like LND: echoes the supplied r_hash and invents a bolt11.
fn echo_invoice(req: &Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "r_hash": body["r_hash"],
        "payment_request": "lnbcrt694200n1pjzapkit",
        "add_index": "42",
        "payment_addr": "c29tZQ=="
    }))
}

#[tokio::test]
async fn test_create_invoice_sends_commitment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .and(header("grpc-metadata-macaroon", MACAROON))
        .respond_with(echo_invoice)
        .expect(1)
        .mount(&server)
        .await;

    let pair = CommitmentPair::from_preimage([5u8; 32]);
    let expected_hash = *pair.hash();
    let description = br#"{"kind":9734}"#;

    let invoice = service(&server)
        .create_invoice(pair, 69420, description)
        .await
        .unwrap();

    assert_eq!(invoice.amount_msat(), 69420);
    assert_eq!(invoice.payment_request(), "lnbcrt694200n1pjzapkit");
    assert_eq!(invoice.payment_hash(), &expected_hash);
    assert_eq!(invoice.add_index(), Some(42));
    assert_eq!(
        invoice.description_hash(),
        &description_hash(&Sha256Hasher, description)
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["value"], 69420);
    assert_eq!(body["r_preimage"], BASE64.encode([5u8; 32]));
    assert_eq!(body["r_hash"], BASE64.encode(expected_hash));

    // description_hash = SHA256(base64(description)), sent base64 encoded
    let recomputed: [u8; 32] = Sha256::digest(BASE64.encode(description).as_bytes()).into();
    assert_eq!(body["description_hash"], BASE64.encode(recomputed));
}

#[tokio::test]
async fn test_server_error_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "code": 2,
            "message": "internal error"
        })))
        .mount(&server)
        .await;

    let err = service(&server)
        .create_invoice(CommitmentPair::generate().unwrap(), 1000, b"desc")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ZapError::Service { status: Some(500), ref reason } if reason == "internal error"
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unparsable_body_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = service(&server)
        .create_invoice(CommitmentPair::generate().unwrap(), 1000, b"desc")
        .await
        .unwrap_err();
    assert!(matches!(err, ZapError::Service { .. }));
}

#[tokio::test]
async fn test_mismatched_hash_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "r_hash": BASE64.encode([0u8; 32]),
            "payment_request": "lnbcrt1"
        })))
        .mount(&server)
        .await;

    let err = service(&server)
        .create_invoice(CommitmentPair::from_preimage([1u8; 32]), 1000, b"desc")
        .await
        .unwrap_err();
    assert!(matches!(err, ZapError::Service { .. }));
}

#[tokio::test]
async fn test_wrong_macaroon_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .and(header("grpc-metadata-macaroon", MACAROON))
        .respond_with(echo_invoice)
        .mount(&server)
        .await;

    let config = LndConfig::new(server.uri(), "ffff");
    let err = LndInvoiceService::new(config)
        .unwrap()
        .create_invoice(CommitmentPair::generate().unwrap(), 1000, b"desc")
        .await
        .unwrap_err();
    // wiremock answers unmatched requests with 404
    assert!(matches!(err, ZapError::Service { status: Some(404), .. }));
}

#[tokio::test]
async fn test_slow_node_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(|req: &Request| echo_invoice(req).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = LndConfig::new(server.uri(), MACAROON).with_timeout(1);
    let err = LndInvoiceService::new(config)
        .unwrap()
        .create_invoice(CommitmentPair::generate().unwrap(), 1000, b"desc")
        .await
        .unwrap_err();

    assert!(matches!(err, ZapError::Timeout { timeout_ms: 1000, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_node_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = LndConfig::new(format!("http://127.0.0.1:{}", port), MACAROON);
    let err = LndInvoiceService::new(config)
        .unwrap()
        .create_invoice(CommitmentPair::generate().unwrap(), 1000, b"desc")
        .await
        .unwrap_err();

    assert!(matches!(err, ZapError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_zero_amount_never_reaches_node() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(echo_invoice)
        .expect(0)
        .mount(&server)
        .await;

    let err = service(&server)
        .create_invoice(CommitmentPair::generate().unwrap(), 0, b"desc")
        .await
        .unwrap_err();
    assert!(matches!(err, ZapError::MalformedInput { .. }));
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn test_real_lnd_invoice() {
    let config = ZapConfig::from_env().unwrap();
    let lnd = config
        .require_lnd()
        .expect("ZAPKIT_LND_URL and ZAPKIT_LND_MACAROON must be set")
        .clone();

    let invoice = LndInvoiceService::new(lnd)
        .unwrap()
        .create_invoice(CommitmentPair::generate().unwrap(), 2100, b"zapkit test")
        .await
        .unwrap();
    assert!(invoice.payment_request().starts_with("ln"));
}
